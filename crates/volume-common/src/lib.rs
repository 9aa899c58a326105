//! Shared types for the density-volume-server workspace.
//!
//! This crate holds the leaf types used by every other crate: the typed
//! error enum, the query box union, unit-cell geometry, and value
//! statistics. It has no I/O and no async code.

pub mod cell;
pub mod error;
pub mod grid;
pub mod query;
pub mod stats;

pub use cell::UnitCell;
pub use error::{VolumeError, VolumeResult};
pub use grid::VoxelRange;
pub use query::{Detail, OutputEncoding, QueryBox};
pub use stats::ValueStats;

/// Default per-precision-tier voxel budgets, finest tier first.
///
/// Detail level `d` permits at most `DEFAULT_VOXEL_BUDGETS[d]` voxels in
/// the response; the ladder matches the original server deployment.
pub const DEFAULT_VOXEL_BUDGETS: &[u64] = &[
    524_288,    // 0.5M
    1_048_576,  // 1M
    2_097_152,  // 2M
    4_194_304,  // 4M
    8_388_608,  // 8M
    16_777_216, // 16M
    25_165_824, // 24M
    33_554_432, // 32M
];
