//! MDV writer: packs dense f32 grids into the block-structured format.
//!
//! Used by ingestion tooling and by every test fixture. The writer
//! derives coarser levels by mean downsampling, computes per-level
//! statistics over the values as stored (after any quantization), and
//! lays out block payloads in the same z-major order as the index.

use std::io::Write;
use std::path::Path;

use volume_common::{UnitCell, ValueStats, VolumeError, VolumeResult};

use crate::downsample::halve;
use crate::header::block_grid;
use crate::value_type::ValueType;
use crate::{FORMAT_VERSION, MAGIC};

/// Result of writing an MDV file.
#[derive(Debug)]
pub struct MdvWriteResult {
    /// Total bytes written, header included.
    pub bytes_written: u64,
    /// Number of sampling levels actually produced.
    pub level_count: usize,
}

/// Writer for creating MDV files from dense grids.
pub struct MdvWriter {
    cell: UnitCell,
    origin_frac: [f64; 3],
    box_frac: [f64; 3],
    value_type: ValueType,
    block_size: u32,
}

impl MdvWriter {
    /// Create a writer for data covering the given fractional sub-box.
    pub fn new(cell: UnitCell, origin_frac: [f64; 3], box_frac: [f64; 3]) -> Self {
        Self {
            cell,
            origin_frac,
            box_frac,
            value_type: ValueType::F32,
            block_size: 32,
        }
    }

    /// Set the on-disk element type (default f32).
    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Set the cubic block edge length (default 32).
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    /// Write a volume to `path`.
    ///
    /// `data` is the finest-level grid in row-major order (x fastest),
    /// `extent` its dimensions. Up to `max_levels` sampling levels are
    /// produced; downsampling stops early once an axis would collapse
    /// below two voxels.
    pub fn write(
        &self,
        path: &Path,
        data: &[f32],
        extent: [u32; 3],
        max_levels: usize,
    ) -> VolumeResult<MdvWriteResult> {
        let expected = extent.iter().map(|&n| n as usize).product::<usize>();
        if data.len() != expected {
            return Err(VolumeError::format(format!(
                "data length {} does not match extent {:?} ({} voxels)",
                data.len(),
                extent,
                expected
            )));
        }
        if self.block_size == 0 || max_levels == 0 {
            return Err(VolumeError::format(
                "block size and level count must be positive",
            ));
        }

        // Build level grids, quantized to what the file will store so
        // the recorded stats describe the on-disk values exactly.
        let mut levels: Vec<LevelData> = Vec::new();
        let mut grid = quantize(data, self.value_type);
        let mut dims = extent;
        let mut rate = 1u32;
        for _ in 0..max_levels {
            levels.push(LevelData {
                rate,
                dims,
                stats: ValueStats::from_values(&grid),
                values: grid.clone(),
            });
            if dims.iter().any(|&d| d < 2) {
                break;
            }
            let (next, next_dims) = halve(&grid, dims);
            grid = quantize(&next, self.value_type);
            dims = next_dims;
            rate *= 2;
        }

        // Header size is fixed once the block counts are known, which
        // pins every payload offset before anything is written.
        let mut header_len = 16 + 4 + 24 + 24 + 12 + 24 + 24;
        for level in &levels {
            let blocks = block_grid(level.dims, self.block_size);
            let count = blocks.iter().map(|&b| b as u64).product::<u64>();
            header_len += 56 + 16 * count as usize;
        }

        let mut header = Vec::with_capacity(header_len);
        let mut payload = Vec::new();

        header.extend_from_slice(&MAGIC);
        put_u32(&mut header, FORMAT_VERSION);
        put_u32(&mut header, self.value_type.tag());
        put_u32(&mut header, levels.len() as u32);
        put_u32(&mut header, self.cell.spacegroup);
        for v in self.cell.size {
            put_f64(&mut header, v);
        }
        for v in self.cell.angles {
            put_f64(&mut header, v);
        }
        for v in extent {
            put_u32(&mut header, v);
        }
        for v in self.origin_frac {
            put_f64(&mut header, v);
        }
        for v in self.box_frac {
            put_f64(&mut header, v);
        }

        for level in &levels {
            let blocks = block_grid(level.dims, self.block_size);

            put_u32(&mut header, level.rate);
            for v in level.dims {
                put_u32(&mut header, v);
            }
            put_u32(&mut header, self.block_size);
            put_f64(&mut header, level.stats.min);
            put_f64(&mut header, level.stats.max);
            put_f64(&mut header, level.stats.mean);
            put_f64(&mut header, level.stats.sigma);

            let count = blocks.iter().map(|&b| b as u32).product::<u32>();
            put_u32(&mut header, count);

            for bz in 0..blocks[2] {
                for by in 0..blocks[1] {
                    for bx in 0..blocks[0] {
                        let block =
                            extract_block(&level.values, level.dims, [bx, by, bz], self.block_size);
                        let offset = header_len as u64 + payload.len() as u64;
                        let before = payload.len();
                        self.value_type.encode(&block, &mut payload);
                        put_u64(&mut header, offset);
                        put_u64(&mut header, (payload.len() - before) as u64);
                    }
                }
            }
        }
        debug_assert_eq!(header.len(), header_len);

        let mut file = std::fs::File::create(path).map_err(|e| VolumeError::Io(e.to_string()))?;
        file.write_all(&header)?;
        file.write_all(&payload)?;
        file.sync_all().map_err(|e| VolumeError::Io(e.to_string()))?;

        tracing::debug!(
            path = %path.display(),
            levels = levels.len(),
            bytes = header.len() + payload.len(),
            "wrote MDV file"
        );

        Ok(MdvWriteResult {
            bytes_written: (header.len() + payload.len()) as u64,
            level_count: levels.len(),
        })
    }
}

struct LevelData {
    rate: u32,
    dims: [u32; 3],
    stats: ValueStats,
    values: Vec<f32>,
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_f64(buf: &mut Vec<u8>, v: f64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Round-trip values through the on-disk representation so stored stats
/// match what a reader will decode.
fn quantize(values: &[f32], value_type: ValueType) -> Vec<f32> {
    match value_type {
        ValueType::F32 => values.to_vec(),
        ValueType::U8 => values
            .iter()
            .map(|&v| v.round().clamp(0.0, 255.0) as u8 as f32)
            .collect(),
        ValueType::I16 => values
            .iter()
            .map(|&v| v.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16 as f32)
            .collect(),
    }
}

/// Copy one block out of a dense level grid, x fastest.
fn extract_block(grid: &[f32], dims: [u32; 3], coord: [u32; 3], block_size: u32) -> Vec<f32> {
    let [nx, ny, _] = dims.map(|d| d as usize);
    let bs = block_size as usize;
    let start = coord.map(|c| c as usize * bs);
    let mut size = [0usize; 3];
    for i in 0..3 {
        size[i] = bs.min(dims[i] as usize - start[i]);
    }

    let mut out = Vec::with_capacity(size[0] * size[1] * size[2]);
    for z in start[2]..start[2] + size[2] {
        for y in start[1]..start[1] + size[1] {
            let row = (z * ny + y) * nx + start[0];
            out.extend_from_slice(&grid[row..row + size[0]]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::read_header;

    fn small_volume() -> (Vec<f32>, [u32; 3]) {
        let extent = [8u32, 8, 8];
        let data = (0..512).map(|i| i as f32).collect();
        (data, extent)
    }

    #[test]
    fn test_write_then_read_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.mdv");
        let (data, extent) = small_volume();

        let writer = MdvWriter::new(
            UnitCell::orthogonal([80.0, 80.0, 80.0]),
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
        )
        .with_block_size(4);
        let result = writer.write(&path, &data, extent, 2).unwrap();
        assert_eq!(result.level_count, 2);

        let header = read_header(&path).unwrap();
        assert_eq!(header.grid_extent, extent);
        assert_eq!(header.levels.len(), 2);
        assert_eq!(header.levels[0].rate, 1);
        assert_eq!(header.levels[1].rate, 2);
        assert_eq!(header.levels[1].sample_count, [4, 4, 4]);
        assert!(header.levels[0].stats.is_consistent());
        assert_eq!(header.levels[0].index.len(), 8);
    }

    #[test]
    fn test_downsampling_stops_at_tiny_grids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.mdv");
        let writer = MdvWriter::new(
            UnitCell::orthogonal([10.0, 10.0, 10.0]),
            [0.0; 3],
            [1.0; 3],
        )
        .with_block_size(4);

        // A 2x2x2 grid halves once to 1x1x1 and then stops.
        let result = writer.write(&path, &[1.0; 8], [2, 2, 2], 10).unwrap();
        assert_eq!(result.level_count, 2);
        assert_eq!(read_header(&path).unwrap().levels[1].sample_count, [1, 1, 1]);
    }

    #[test]
    fn test_u8_stats_describe_stored_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u8.mdv");
        let writer = MdvWriter::new(
            UnitCell::orthogonal([10.0, 10.0, 10.0]),
            [0.0; 3],
            [1.0; 3],
        )
        .with_block_size(4)
        .with_value_type(ValueType::U8);

        // 0.4 rounds to 0, 300.0 clamps to 255.
        let data = vec![0.4f32, 300.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0];
        writer.write(&path, &data, [2, 2, 2], 1).unwrap();

        let header = read_header(&path).unwrap();
        let stats = header.levels[0].stats;
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 255.0);
    }

    #[test]
    fn test_data_length_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mdv");
        let writer =
            MdvWriter::new(UnitCell::orthogonal([10.0; 3]), [0.0; 3], [1.0; 3]);
        assert!(writer.write(&path, &[1.0; 7], [2, 2, 2], 1).is_err());
    }

    #[test]
    fn test_extract_block_edge_crop() {
        // 3x3x1 grid, block size 2: block [1,0,0] holds the 1x3 right edge.
        let grid: Vec<f32> = (0..9).map(|v| v as f32).collect();
        let block = extract_block(&grid, [3, 3, 1], [1, 0, 0], 2);
        assert_eq!(block, vec![2.0, 5.0]);
    }
}
