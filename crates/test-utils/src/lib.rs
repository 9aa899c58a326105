//! Shared test utilities for the density-volume workspace.
//!
//! This crate provides common testing infrastructure:
//! - Synthetic volume generators with verifiable voxel patterns
//! - A builder for on-disk MDV fixture files in temp directories
//! - Approximate-equality assertion macros
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::{TestVolume, TestVolumeBuilder};
pub use generators::{coded_value, coded_volume, gaussian_volume};

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro asserting that two voxel slices match within the round-trip
/// tolerance used by the text encoding.
#[macro_export]
macro_rules! assert_values_approx_eq {
    ($left:expr, $right:expr) => {{
        let left: &[f32] = $left;
        let right: &[f32] = $right;
        assert_eq!(left.len(), right.len(), "value counts differ");
        for (i, (a, b)) in left.iter().zip(right.iter()).enumerate() {
            let tol = 5e-7_f32 * a.abs().max(1.0);
            if (a - b).abs() > tol {
                panic!(
                    "value {} differs: `{:?}` vs `{:?}` (tolerance `{:?}`)",
                    i, a, b, tol
                );
            }
        }
    }};
}
