//! Sampling-level selection.

use mdv_parser::Header;
use volume_common::{Detail, QueryBox, VolumeError, VolumeResult};

use crate::mapper::to_voxel_range;

/// Pick the sampling level that serves a query.
///
/// A forced level is validated against the file and returned as-is;
/// an out-of-range index is an invalid query and touches no data.
/// Otherwise the box is measured on the finest grid and the finest
/// level whose voxel count fits the detail budget wins. No budget
/// fits, the coarsest level serves the query; selection never fails
/// for a well-formed box.
pub fn select_level(
    header: &Header,
    query_box: &QueryBox,
    detail: &Detail,
    budgets: &[u64],
) -> VolumeResult<usize> {
    match detail {
        Detail::ForcedLevel(level) => {
            if *level >= header.levels.len() {
                return Err(VolumeError::invalid_query(format!(
                    "forced level {} out of range, file has {} levels",
                    level,
                    header.levels.len()
                )));
            }
            Ok(*level)
        }
        Detail::Precision(precision) => {
            let finest = to_voxel_range(header, query_box, 0)?;
            if finest.is_empty() {
                // Nothing to read; the finest level reports the miss.
                return Ok(0);
            }
            let extent = finest.dims();

            let budget = match budgets {
                [] => return Ok(header.levels.len() - 1),
                _ => budgets[(*precision).min(budgets.len() - 1)],
            };

            for (i, level) in header.levels.iter().enumerate() {
                let rate = level.rate as u64;
                let count: u64 = extent.iter().map(|&e| e.div_ceil(rate)).product();
                if count <= budget {
                    return Ok(i);
                }
            }
            Ok(header.levels.len() - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdv_parser::{block_grid, BlockIndex, ByteRange, SamplingLevel, ValueType};
    use volume_common::{UnitCell, ValueStats};

    fn level(rate: u32, sample_count: [u32; 3]) -> SamplingLevel {
        let blocks = block_grid(sample_count, 32);
        let count = blocks.iter().map(|&b| b as usize).product::<usize>();
        let entries = (0..count)
            .map(|i| ByteRange {
                offset: i as u64 * 4,
                len: 4,
            })
            .collect();
        SamplingLevel {
            rate,
            sample_count,
            block_size: 32,
            stats: ValueStats::default(),
            index: BlockIndex::new(blocks, entries).unwrap(),
        }
    }

    fn two_level_header() -> Header {
        Header {
            value_type: ValueType::F32,
            cell: UnitCell::orthogonal([100.0, 100.0, 100.0]),
            grid_extent: [100, 100, 100],
            origin_frac: [0.0; 3],
            box_frac: [1.0; 3],
            levels: vec![level(1, [100, 100, 100]), level(4, [25, 25, 25])],
        }
    }

    #[test]
    fn test_small_box_selects_finest() {
        let header = two_level_header();
        let query_box = QueryBox::cartesian([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        let picked =
            select_level(&header, &query_box, &Detail::Precision(1), &[500, 1_000_000]).unwrap();
        assert_eq!(picked, 0);
    }

    #[test]
    fn test_big_box_falls_to_coarser() {
        let header = two_level_header();
        // Whole cell at the finest level is 1M voxels; budget 500 rejects
        // it and the rate-4 level (15625 voxels) also exceeds it, so the
        // coarsest level still serves the query.
        let picked =
            select_level(&header, &QueryBox::Cell, &Detail::Precision(0), &[500, 100_000]).unwrap();
        assert_eq!(picked, 1);

        // Budget 100k admits the rate-4 level.
        let picked =
            select_level(&header, &QueryBox::Cell, &Detail::Precision(1), &[500, 100_000]).unwrap();
        assert_eq!(picked, 1);
    }

    #[test]
    fn test_detail_clamps_to_budget_table() {
        let header = two_level_header();
        let query_box = QueryBox::cartesian([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        let picked =
            select_level(&header, &query_box, &Detail::Precision(99), &[500, 1_000_000]).unwrap();
        assert_eq!(picked, 0);
    }

    #[test]
    fn test_forced_level_skips_budget() {
        let header = two_level_header();
        let picked =
            select_level(&header, &QueryBox::Cell, &Detail::ForcedLevel(1), &[1]).unwrap();
        assert_eq!(picked, 1);
    }

    #[test]
    fn test_forced_level_out_of_range() {
        let header = two_level_header();
        let err =
            select_level(&header, &QueryBox::Cell, &Detail::ForcedLevel(2), &[1]).unwrap_err();
        assert!(matches!(err, VolumeError::InvalidQuery(_)));
    }

    #[test]
    fn test_miss_selects_finest() {
        let header = two_level_header();
        let query_box = QueryBox::fractional([2.0, 2.0, 2.0], [3.0, 3.0, 3.0]);
        let picked = select_level(&header, &query_box, &Detail::Precision(0), &[500]).unwrap();
        assert_eq!(picked, 0);
    }

    #[test]
    fn test_budget_property_holds() {
        // For any admitted level, the served voxel count never exceeds
        // the budget unless the coarsest level was the fallback.
        let header = two_level_header();
        let query_box = QueryBox::cartesian([0.0, 0.0, 0.0], [50.0, 50.0, 50.0]);
        let budgets = [200_000u64];

        let picked = select_level(&header, &query_box, &Detail::Precision(0), &budgets).unwrap();
        let extent = to_voxel_range(&header, &query_box, 0).unwrap().dims();
        let rate = header.levels[picked].rate as u64;
        let count: u64 = extent.iter().map(|&e| e.div_ceil(rate)).product();
        assert!(count <= budgets[0] || picked == header.levels.len() - 1);
    }
}
