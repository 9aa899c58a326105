//! Mapping query boxes onto a sampling level's voxel grid.

use mdv_parser::Header;
use volume_common::{QueryBox, VolumeError, VolumeResult, VoxelRange};

/// Map a query box to the inclusive voxel range it covers on a level.
///
/// Corners are sorted per axis after any Cartesian conversion, so the
/// two corners can be given in any order even for skewed cells. The
/// result is clipped to the level's grid; a box entirely outside the
/// stored extent, or degenerate on any axis, yields an empty range,
/// never an error.
pub fn to_voxel_range(header: &Header, query_box: &QueryBox, level: usize) -> VolumeResult<VoxelRange> {
    let lvl = header.levels.get(level).ok_or_else(|| {
        VolumeError::invalid_query(format!(
            "level {} out of range, file has {} levels",
            level,
            header.levels.len()
        ))
    })?;
    let sample_count = lvl.sample_count;

    let (lo, hi) = match query_box {
        QueryBox::Cell => {
            let mut max = [0i64; 3];
            for i in 0..3 {
                max[i] = sample_count[i] as i64 - 1;
            }
            return Ok(VoxelRange::new([0; 3], max));
        }
        QueryBox::Fractional { a, b } => QueryBox::sorted_corners(*a, *b),
        QueryBox::Cartesian { a, b } => {
            let fa = header.cell.to_fractional(*a)?;
            let fb = header.cell.to_fractional(*b)?;
            QueryBox::sorted_corners(fa, fb)
        }
    };

    // A box with zero extent on any axis covers no voxels; outward
    // rounding below would otherwise widen it into a thin slab.
    if lo.iter().zip(hi.iter()).any(|(a, b)| a >= b) {
        return Ok(VoxelRange::empty());
    }

    let mut min = [0i64; 3];
    let mut max = [0i64; 3];
    for i in 0..3 {
        let scale = sample_count[i] as f64 / header.box_frac[i];
        min[i] = ((lo[i] - header.origin_frac[i]) * scale).floor() as i64;
        max[i] = ((hi[i] - header.origin_frac[i]) * scale).ceil() as i64;
    }

    Ok(VoxelRange::new(min, max).clip_to_extent(sample_count))
}
