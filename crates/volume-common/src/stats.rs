//! Value statistics over a voxel population.

use serde::{Deserialize, Serialize};

/// Min/max/mean/sigma over a set of voxel values.
///
/// Stored per sampling level in the file header, and recomputed over the
/// exact crop for every query result (a crop is a sub-population, so the
/// whole-level numbers do not apply to it).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sigma: f64,
}

impl ValueStats {
    /// Compute statistics in a single pass.
    ///
    /// An empty slice yields all-zero stats; an empty crop is a valid
    /// result, not an error.
    pub fn from_values(values: &[f32]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut sq_sum = 0.0;
        for &v in values {
            let v = v as f64;
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
            sum += v;
            sq_sum += v * v;
        }

        let n = values.len() as f64;
        let mean = sum / n;
        let variance = (sq_sum / n - mean * mean).max(0.0);

        Self {
            min,
            max,
            mean,
            sigma: variance.sqrt(),
        }
    }

    /// Check the `min <= mean <= max` header invariant.
    ///
    /// A small tolerance absorbs accumulation error in stored headers.
    pub fn is_consistent(&self) -> bool {
        const EPS: f64 = 1e-6;
        self.min <= self.mean + EPS && self.mean <= self.max + EPS && self.sigma >= 0.0
    }
}
