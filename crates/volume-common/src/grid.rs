//! Integer voxel ranges on a sampling level's grid.

use serde::{Deserialize, Serialize};

/// An inclusive integer voxel range `[min, max]` per axis.
///
/// `min > max` on any axis marks an empty range. Empty ranges are a
/// normal outcome of clipping, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelRange {
    pub min: [i64; 3],
    pub max: [i64; 3],
}

impl VoxelRange {
    /// Create a range from inclusive bounds.
    pub fn new(min: [i64; 3], max: [i64; 3]) -> Self {
        Self { min, max }
    }

    /// The canonical empty range.
    pub fn empty() -> Self {
        Self {
            min: [0; 3],
            max: [-1; 3],
        }
    }

    /// Whether any axis is inverted (no voxels selected).
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    /// Voxel counts per axis; zero on every axis when empty.
    pub fn dims(&self) -> [u64; 3] {
        if self.is_empty() {
            return [0; 3];
        }
        let mut d = [0u64; 3];
        for i in 0..3 {
            d[i] = (self.max[i] - self.min[i] + 1) as u64;
        }
        d
    }

    /// Total voxel count of the range.
    pub fn voxel_count(&self) -> u64 {
        self.dims().iter().product()
    }

    /// Clip this range to `[0, extent-1]` per axis.
    pub fn clip_to_extent(&self, extent: [u32; 3]) -> Self {
        let mut out = *self;
        for i in 0..3 {
            out.min[i] = out.min[i].max(0);
            out.max[i] = out.max[i].min(extent[i] as i64 - 1);
        }
        out
    }

    /// Intersection with another range.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut out = Self::empty();
        for i in 0..3 {
            out.min[i] = self.min[i].max(other.min[i]);
            out.max[i] = self.max[i].min(other.max[i]);
        }
        out
    }

    /// Whether a voxel index lies inside this range.
    pub fn contains(&self, p: [i64; 3]) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dims_and_count() {
        let r = VoxelRange::new([0, 0, 0], [10, 10, 10]);
        assert_eq!(r.dims(), [11, 11, 11]);
        assert_eq!(r.voxel_count(), 1331);
        assert!(!r.is_empty());
    }

    #[test]
    fn test_empty_range() {
        let r = VoxelRange::empty();
        assert!(r.is_empty());
        assert_eq!(r.voxel_count(), 0);
        assert_eq!(r.dims(), [0, 0, 0]);
    }

    #[test]
    fn test_clip_outside_is_empty() {
        let r = VoxelRange::new([50, 0, 0], [60, 5, 5]).clip_to_extent([32, 32, 32]);
        assert!(r.is_empty());
    }

    #[test]
    fn test_clip_partial_overlap() {
        let r = VoxelRange::new([-5, 10, 30], [10, 20, 40]).clip_to_extent([32, 32, 32]);
        assert_eq!(r.min, [0, 10, 30]);
        assert_eq!(r.max, [10, 20, 31]);
    }

    #[test]
    fn test_intersect() {
        let a = VoxelRange::new([0, 0, 0], [10, 10, 10]);
        let b = VoxelRange::new([5, 5, 5], [20, 20, 20]);
        let i = a.intersect(&b);
        assert_eq!(i.min, [5, 5, 5]);
        assert_eq!(i.max, [10, 10, 10]);

        let c = VoxelRange::new([15, 0, 0], [20, 10, 10]);
        assert!(a.intersect(&c).is_empty());
    }
}
