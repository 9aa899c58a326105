//! Header model: preamble, cell/grid metadata, and per-level records.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use volume_common::{UnitCell, ValueStats, VolumeError, VolumeResult, VoxelRange};

use crate::index::{BlockCoord, BlockIndex, ByteRange};
use crate::value_type::ValueType;
use crate::{FORMAT_VERSION, MAGIC};

/// One stored resolution of the volume.
#[derive(Debug, Clone)]
pub struct SamplingLevel {
    /// Integer downsampling factor relative to the finest level.
    pub rate: u32,
    /// Grid size at this level.
    pub sample_count: [u32; 3],
    /// Edge length of a cubic storage block.
    pub block_size: u32,
    /// Whole-level value statistics.
    pub stats: ValueStats,
    /// Block coordinate -> byte range.
    pub index: BlockIndex,
}

impl SamplingLevel {
    /// Total voxel count of this level.
    pub fn voxel_count(&self) -> u64 {
        self.sample_count.iter().map(|&n| n as u64).product()
    }

    /// Voxel dimensions of a block, cropped at the level's edges.
    pub fn block_dims(&self, coord: BlockCoord) -> [u32; 3] {
        let bs = self.block_size;
        let mut dims = [0u32; 3];
        for i in 0..3 {
            let start = coord[i] * bs;
            dims[i] = bs.min(self.sample_count[i].saturating_sub(start));
        }
        dims
    }

    /// The voxel range a block covers on this level's grid.
    pub fn block_voxel_range(&self, coord: BlockCoord) -> VoxelRange {
        let bs = self.block_size as i64;
        let dims = self.block_dims(coord);
        let mut min = [0i64; 3];
        let mut max = [0i64; 3];
        for i in 0..3 {
            min[i] = coord[i] as i64 * bs;
            max[i] = min[i] + dims[i] as i64 - 1;
        }
        VoxelRange::new(min, max)
    }

    /// Expected payload length in bytes for a block.
    pub fn expected_block_len(&self, coord: BlockCoord, value_type: ValueType) -> u64 {
        let dims = self.block_dims(coord);
        dims.iter().map(|&d| d as u64).product::<u64>() * value_type.byte_size() as u64
    }
}

/// Parsed MDV header: fixed metadata shared by every query on the file.
///
/// Immutable once parsed and safely shared across concurrent queries
/// without synchronization.
#[derive(Debug, Clone)]
pub struct Header {
    /// On-disk element type.
    pub value_type: ValueType,
    /// Unit-cell geometry.
    pub cell: UnitCell,
    /// Grid size of the finest level, in full-cell grid units.
    pub grid_extent: [u32; 3],
    /// Fractional origin of the stored sub-box.
    pub origin_frac: [f64; 3],
    /// Fractional extent of the stored sub-box (all components > 0).
    pub box_frac: [f64; 3],
    /// Sampling levels, finest to coarsest.
    pub levels: Vec<SamplingLevel>,
}

impl Header {
    /// Parse a header from a reader positioned at byte 0.
    ///
    /// Call [`Header::validate`] with the file length afterwards to check
    /// byte ranges; parsing alone cannot see the payload region.
    pub fn parse(r: &mut impl Read) -> VolumeResult<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(VolumeError::format(format!(
                "bad magic {:?}, expected {:?}",
                magic, MAGIC
            )));
        }

        let version = read_u32(r)?;
        if version != FORMAT_VERSION {
            return Err(VolumeError::format(format!(
                "unsupported format version {}, expected {}",
                version, FORMAT_VERSION
            )));
        }

        let value_type = ValueType::from_tag(read_u32(r)?)?;
        let level_count = read_u32(r)?;
        if level_count == 0 {
            return Err(VolumeError::format("file declares zero sampling levels"));
        }

        let spacegroup = read_u32(r)?;
        let cell_size = read_f64_triple(r)?;
        let cell_angles = read_f64_triple(r)?;
        let cell = UnitCell::new(spacegroup, cell_size, cell_angles)?;

        let grid_extent = read_u32_triple(r)?;
        if grid_extent.iter().any(|&n| n == 0) {
            return Err(VolumeError::format(format!(
                "grid extent must be positive on every axis, got {:?}",
                grid_extent
            )));
        }

        let origin_frac = read_f64_triple(r)?;
        let box_frac = read_f64_triple(r)?;
        if box_frac.iter().any(|&e| !(e > 0.0) || !e.is_finite()) {
            return Err(VolumeError::format(format!(
                "fractional box must be non-degenerate, got extent {:?}",
                box_frac
            )));
        }

        let mut levels = Vec::with_capacity(level_count as usize);
        for level_index in 0..level_count {
            levels.push(Self::parse_level(r, level_index)?);
        }

        let header = Self {
            value_type,
            cell,
            grid_extent,
            origin_frac,
            box_frac,
            levels,
        };
        header.check_level_progression()?;
        Ok(header)
    }

    fn parse_level(r: &mut impl Read, level_index: u32) -> VolumeResult<SamplingLevel> {
        let rate = read_u32(r)?;
        let sample_count = read_u32_triple(r)?;
        let block_size = read_u32(r)?;
        if block_size == 0 {
            return Err(VolumeError::format(format!(
                "level {} has zero block size",
                level_index
            )));
        }
        if sample_count.iter().any(|&n| n == 0) {
            return Err(VolumeError::format(format!(
                "level {} has empty sample count {:?}",
                level_index, sample_count
            )));
        }

        let stats = ValueStats {
            min: read_f64(r)?,
            max: read_f64(r)?,
            mean: read_f64(r)?,
            sigma: read_f64(r)?,
        };
        if !stats.is_consistent() {
            return Err(VolumeError::format(format!(
                "level {} stats violate min <= mean <= max: {:?}",
                level_index, stats
            )));
        }

        let blocks = block_grid(sample_count, block_size);
        let declared = read_u32(r)?;
        let expected = blocks.iter().map(|&b| b as u64).product::<u64>();
        if declared as u64 != expected {
            return Err(VolumeError::format(format!(
                "level {} declares {} blocks, geometry implies {}",
                level_index, declared, expected
            )));
        }

        let mut entries = Vec::with_capacity(declared as usize);
        for _ in 0..declared {
            entries.push(ByteRange {
                offset: read_u64(r)?,
                len: read_u64(r)?,
            });
        }

        Ok(SamplingLevel {
            rate,
            sample_count,
            block_size,
            stats,
            index: BlockIndex::new(blocks, entries)?,
        })
    }

    /// Rates must start at 1 and be strictly increasing, and each level's
    /// sample count must match `ceil(grid_extent / rate)`.
    fn check_level_progression(&self) -> VolumeResult<()> {
        let mut prev_rate = 0u32;
        for (i, level) in self.levels.iter().enumerate() {
            if i == 0 && level.rate != 1 {
                return Err(VolumeError::format(format!(
                    "finest level must have rate 1, got {}",
                    level.rate
                )));
            }
            if level.rate <= prev_rate {
                return Err(VolumeError::format(format!(
                    "level {} rate {} does not increase over previous rate {}",
                    i, level.rate, prev_rate
                )));
            }
            for axis in 0..3 {
                let expected = self.grid_extent[axis].div_ceil(level.rate);
                if level.sample_count[axis] != expected {
                    return Err(VolumeError::format(format!(
                        "level {} axis {} sample count {} != ceil({} / {}) = {}",
                        i, axis, level.sample_count[axis], self.grid_extent[axis],
                        level.rate, expected
                    )));
                }
            }
            prev_rate = level.rate;
        }
        Ok(())
    }

    /// Validate every declared byte range against the file's real length
    /// and the block's expected decoded size.
    pub fn validate(&self, file_len: u64) -> VolumeResult<()> {
        for (i, level) in self.levels.iter().enumerate() {
            for (coord, range) in level.index.iter() {
                if range.end() > file_len {
                    return Err(VolumeError::format(format!(
                        "level {} block {:?} range {}..{} exceeds file length {}",
                        i,
                        coord,
                        range.offset,
                        range.end(),
                        file_len
                    )));
                }
                let expected = level.expected_block_len(coord, self.value_type);
                if range.len != expected {
                    return Err(VolumeError::format(format!(
                        "level {} block {:?} declares {} bytes, expected {}",
                        i, coord, range.len, expected
                    )));
                }
            }
        }
        Ok(())
    }

    /// JSON-serializable summary for the header/info endpoint.
    pub fn summary(&self) -> HeaderSummary {
        HeaderSummary {
            format_version: FORMAT_VERSION,
            value_type: self.value_type,
            cell: self.cell,
            grid_extent: self.grid_extent,
            origin_frac: self.origin_frac,
            box_frac: self.box_frac,
            sampling: self
                .levels
                .iter()
                .map(|l| LevelSummary {
                    rate: l.rate,
                    sample_count: l.sample_count,
                    block_size: l.block_size,
                    stats: l.stats,
                })
                .collect(),
        }
    }
}

/// Serializable view of the header without block indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderSummary {
    pub format_version: u32,
    pub value_type: ValueType,
    pub cell: UnitCell,
    pub grid_extent: [u32; 3],
    pub origin_frac: [f64; 3],
    pub box_frac: [f64; 3],
    pub sampling: Vec<LevelSummary>,
}

/// Serializable view of one sampling level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelSummary {
    pub rate: u32,
    pub sample_count: [u32; 3],
    pub block_size: u32,
    pub stats: ValueStats,
}

/// Open and fully validate the header of an MDV file.
pub fn read_header(path: &Path) -> VolumeResult<Header> {
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => VolumeError::NotFound(path.display().to_string()),
        _ => VolumeError::Io(e.to_string()),
    })?;
    let file_len = file.metadata().map_err(|e| VolumeError::Io(e.to_string()))?.len();

    let mut reader = std::io::BufReader::new(file);
    let header = Header::parse(&mut reader)?;
    header.validate(file_len)?;

    tracing::debug!(
        path = %path.display(),
        levels = header.levels.len(),
        extent = ?header.grid_extent,
        "parsed MDV header"
    );
    Ok(header)
}

/// Block grid size for a sample count and block size.
pub fn block_grid(sample_count: [u32; 3], block_size: u32) -> [u32; 3] {
    let mut blocks = [0u32; 3];
    for i in 0..3 {
        blocks[i] = sample_count[i].div_ceil(block_size);
    }
    blocks
}

fn read_u32(r: &mut impl Read) -> VolumeResult<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(r: &mut impl Read) -> VolumeResult<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64(r: &mut impl Read) -> VolumeResult<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_u32_triple(r: &mut impl Read) -> VolumeResult<[u32; 3]> {
    Ok([read_u32(r)?, read_u32(r)?, read_u32(r)?])
}

fn read_f64_triple(r: &mut impl Read) -> VolumeResult<[f64; 3]> {
    Ok([read_f64(r)?, read_f64(r)?, read_f64(r)?])
}
