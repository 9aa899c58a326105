//! Concurrent block reads and crop assembly.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::stream::{self, StreamExt};
use tokio::task;

use mdv_parser::{blocks_overlapping, BlockCoord};
use volume_common::{VolumeError, VolumeResult, VoxelRange};

use crate::cache::{BlockCache, BlockKey};
use crate::source::VolumeFile;

/// Reads the blocks covering a voxel range and assembles the crop.
///
/// Blocks are fetched with positioned reads on a blocking thread, at
/// most `concurrency` in flight per query. Assembly is keyed by block
/// coordinate, so completion order does not matter. Any failed block
/// fails the whole query and the partial crop is discarded.
pub struct BlockReader {
    cache: Arc<Mutex<BlockCache>>,
    concurrency: usize,
}

impl BlockReader {
    pub fn new(cache: Arc<Mutex<BlockCache>>, concurrency: usize) -> Self {
        Self {
            cache,
            concurrency: concurrency.max(1),
        }
    }

    fn cache(&self) -> VolumeResult<MutexGuard<'_, BlockCache>> {
        self.cache
            .lock()
            .map_err(|_| VolumeError::Io("block cache lock poisoned".to_string()))
    }

    /// Read the crop `range` from one sampling level of a file.
    ///
    /// Returns the voxel values x-fastest, `range.voxel_count()` long.
    /// An empty range reads nothing and returns an empty vector.
    pub async fn read_range(
        &self,
        file: &Arc<VolumeFile>,
        level: usize,
        range: &VoxelRange,
    ) -> VolumeResult<Vec<f32>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let header = file.header();
        let lvl = header.levels.get(level).ok_or_else(|| {
            VolumeError::invalid_query(format!(
                "level {} out of range, file has {} levels",
                level,
                header.levels.len()
            ))
        })?;

        let blocks = blocks_overlapping(&lvl.index, lvl.block_size, range);
        let mut out = vec![0f32; range.voxel_count() as usize];

        // Serve what we can from the cache, collect the rest.
        let mut misses = Vec::new();
        {
            let mut cache = self.cache()?;
            for (coord, byte_range) in blocks {
                let key = block_key(file, level, coord);
                if let Some(data) = cache.get(&key) {
                    copy_block_region(
                        &mut out,
                        range,
                        lvl.block_voxel_range(coord),
                        data,
                        lvl.block_dims(coord),
                    );
                } else {
                    misses.push((coord, byte_range));
                }
            }
        }

        if misses.is_empty() {
            return Ok(out);
        }

        tracing::debug!(
            path = %file.path().display(),
            level,
            blocks = misses.len(),
            "reading blocks"
        );

        let value_type = header.value_type;
        let mut reads = stream::iter(misses.into_iter().map(|(coord, byte_range)| {
            let file = Arc::clone(file);
            async move {
                let raw = task::spawn_blocking(move || file.read_block(byte_range))
                    .await
                    .map_err(|e| VolumeError::Io(e.to_string()))??;
                let data = value_type.decode(&raw)?;
                Ok::<(BlockCoord, Vec<f32>), VolumeError>((coord, data))
            }
        }))
        .buffer_unordered(self.concurrency);

        while let Some(result) = reads.next().await {
            let (coord, data) = result?;

            let dims = lvl.block_dims(coord);
            let expected = dims.iter().map(|&d| d as usize).product::<usize>();
            if data.len() != expected {
                return Err(VolumeError::truncated(format!(
                    "block {:?} decoded to {} voxels, expected {}",
                    coord,
                    data.len(),
                    expected
                )));
            }

            copy_block_region(&mut out, range, lvl.block_voxel_range(coord), &data, dims);
            self.cache()?.insert(block_key(file, level, coord), data);
        }

        Ok(out)
    }
}

fn block_key(file: &VolumeFile, level: usize, coord: BlockCoord) -> BlockKey {
    (file.path_hash(), level, coord[0], coord[1], coord[2])
}

/// Copy the part of a block that falls inside the output range.
///
/// Both buffers are x-fastest; rows along x copy as contiguous slices.
fn copy_block_region(
    out: &mut [f32],
    out_range: &VoxelRange,
    block_range: VoxelRange,
    data: &[f32],
    block_dims: [u32; 3],
) {
    let overlap = out_range.intersect(&block_range);
    if overlap.is_empty() {
        return;
    }

    let od = out_range.dims();
    let run = (overlap.max[0] - overlap.min[0] + 1) as usize;
    for z in overlap.min[2]..=overlap.max[2] {
        for y in overlap.min[1]..=overlap.max[1] {
            let src = ((z - block_range.min[2]) as usize * block_dims[1] as usize
                + (y - block_range.min[1]) as usize)
                * block_dims[0] as usize
                + (overlap.min[0] - block_range.min[0]) as usize;
            let dst = ((z - out_range.min[2]) as usize * od[1] as usize
                + (y - out_range.min[1]) as usize)
                * od[0] as usize
                + (overlap.min[0] - out_range.min[0]) as usize;
            out[dst..dst + run].copy_from_slice(&data[src..src + run]);
        }
    }
}
