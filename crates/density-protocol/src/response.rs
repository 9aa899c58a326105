//! The query result document model.

use serde::{Deserialize, Serialize};

use volume_common::{QueryBox, UnitCell, ValueStats};

/// A fully resolved query result ready for encoding.
///
/// Owned exclusively by the request that produced it; dropped after
/// encoding completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Identifier of the source volume.
    pub source_id: String,
    /// Unit-cell geometry of the source.
    pub cell: UnitCell,
    /// The box the caller asked for, as asked.
    pub query_box: QueryBox,
    /// Index of the sampling level that served the query.
    pub level: usize,
    /// Downsampling rate of that level.
    pub rate: u32,
    /// Voxel index of the crop's origin on the level grid.
    pub origin: [i64; 3],
    /// Voxel counts of the crop per axis; zero for an empty result.
    pub dims: [u64; 3],
    /// Statistics recomputed over exactly the cropped voxels.
    pub stats: ValueStats,
    /// Cropped voxel values, row-major with x fastest.
    pub values: Vec<f32>,
}

impl QueryResponse {
    /// Total voxel count of the crop.
    pub fn voxel_count(&self) -> u64 {
        self.dims.iter().product()
    }

    /// Whether the crop is empty (query box missed the stored extent).
    pub fn is_empty(&self) -> bool {
        self.voxel_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_response() -> QueryResponse {
        QueryResponse {
            source_id: "emd-1234".into(),
            cell: UnitCell::orthogonal([100.0, 100.0, 100.0]),
            query_box: QueryBox::cartesian([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]),
            level: 0,
            rate: 1,
            origin: [0, 0, 0],
            dims: [2, 2, 2],
            stats: ValueStats::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]),
            values: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        }
    }

    #[test]
    fn test_voxel_count() {
        let r = sample_response();
        assert_eq!(r.voxel_count(), 8);
        assert!(!r.is_empty());
    }

    #[test]
    fn test_empty_response() {
        let mut r = sample_response();
        r.dims = [0, 0, 0];
        r.values.clear();
        assert!(r.is_empty());
    }
}
