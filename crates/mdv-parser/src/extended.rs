//! Advisory precision tiers for the extended header.
//!
//! This is client-facing metadata only: it tells a UI which detail
//! levels are worth offering for a given file. Real sampling-level
//! selection lives in `volume-processor` and never consults this list.

use serde::{Deserialize, Serialize};

/// One advisory precision tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecisionTier {
    /// Detail level index into the budget table.
    pub precision: usize,
    /// Voxel budget of that tier.
    pub max_voxels: u64,
}

/// The tier list stops after the first tier whose budget exceeds the
/// finest level's total voxel count, and that tier is included: a budget
/// larger than the whole file still describes a servable request.
pub const INCLUDE_FIRST_EXCEEDING_TIER: bool = true;

/// Compute the tiers achievable for a file whose finest level holds
/// `max_voxel_count` voxels, given a budget table (finest tier first).
pub fn available_precisions(max_voxel_count: u64, budgets: &[u64]) -> Vec<PrecisionTier> {
    let mut tiers = Vec::new();
    for (precision, &max_voxels) in budgets.iter().enumerate() {
        tiers.push(PrecisionTier {
            precision,
            max_voxels,
        });
        if max_voxels > max_voxel_count {
            debug_assert!(INCLUDE_FIRST_EXCEEDING_TIER);
            break;
        }
    }
    tiers
}
