//! Per-level block index: block coordinate -> byte range.

use serde::{Deserialize, Serialize};

use volume_common::{VolumeError, VolumeResult, VoxelRange};

/// Integer coordinate of a block on a level's block grid.
pub type BlockCoord = [u32; 3];

/// A byte range inside the MDV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub offset: u64,
    pub len: u64,
}

impl ByteRange {
    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// Maps block coordinates to byte ranges for one sampling level.
///
/// Entries are stored z-major, then y, then x, matching the order in
/// which block payloads appear in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIndex {
    /// Block grid size per axis.
    pub blocks: [u32; 3],
    entries: Vec<ByteRange>,
}

impl BlockIndex {
    /// Build an index from entries already in z-major order.
    pub fn new(blocks: [u32; 3], entries: Vec<ByteRange>) -> VolumeResult<Self> {
        let expected = blocks.iter().map(|&b| b as usize).product::<usize>();
        if entries.len() != expected {
            return Err(VolumeError::format(format!(
                "block index has {} entries, block grid {:?} needs {}",
                entries.len(),
                blocks,
                expected
            )));
        }
        Ok(Self { blocks, entries })
    }

    /// Number of blocks in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no blocks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the byte range for a block coordinate.
    pub fn entry(&self, coord: BlockCoord) -> Option<ByteRange> {
        let [bx, by, bz] = coord;
        if bx >= self.blocks[0] || by >= self.blocks[1] || bz >= self.blocks[2] {
            return None;
        }
        let idx =
            (bz as usize * self.blocks[1] as usize + by as usize) * self.blocks[0] as usize
                + bx as usize;
        self.entries.get(idx).copied()
    }

    /// Iterate all entries in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockCoord, ByteRange)> + '_ {
        let [nx, ny, _] = self.blocks;
        self.entries.iter().enumerate().map(move |(i, &range)| {
            let i = i as u32;
            let bx = i % nx;
            let by = (i / nx) % ny;
            let bz = i / (nx * ny);
            ([bx, by, bz], range)
        })
    }
}

/// Compute the blocks of a level that overlap a voxel range.
///
/// Pure arithmetic over the index: `floor(index / block_size)` per axis
/// on both bounds. Blocks come back in storage order (z-major, then y,
/// then x) so a sequential reader streams forward through the file.
/// The range is assumed already clipped to the level's extent.
pub fn blocks_overlapping(
    index: &BlockIndex,
    block_size: u32,
    range: &VoxelRange,
) -> Vec<(BlockCoord, ByteRange)> {
    if range.is_empty() || block_size == 0 {
        return Vec::new();
    }

    let bs = block_size as i64;
    let mut lo = [0u32; 3];
    let mut hi = [0u32; 3];
    for i in 0..3 {
        lo[i] = (range.min[i] / bs) as u32;
        hi[i] = ((range.max[i] / bs) as u32).min(index.blocks[i].saturating_sub(1));
    }

    let mut out = Vec::new();
    for bz in lo[2]..=hi[2] {
        for by in lo[1]..=hi[1] {
            for bx in lo[0]..=hi[0] {
                if let Some(entry) = index.entry([bx, by, bz]) {
                    out.push(([bx, by, bz], entry));
                }
            }
        }
    }
    out
}
