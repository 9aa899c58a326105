//! On-disk fixture volumes backed by a temporary directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use mdv_parser::{MdvWriter, ValueType};
use volume_common::{UnitCell, VolumeResult};

use crate::generators::{coded_volume, gaussian_volume};

/// A written MDV file kept alive with its temporary directory.
///
/// Dropping the fixture deletes the file.
pub struct TestVolume {
    dir: TempDir,
    path: PathBuf,
    pub extent: [u32; 3],
    pub data: Vec<f32>,
}

impl TestVolume {
    /// The path of the written file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the directory from being cleaned up, for debugging a
    /// failing test by hand.
    pub fn into_persistent(self) -> PathBuf {
        let _ = self.dir.into_path();
        self.path
    }
}

/// Builder for fixture volumes.
///
/// Defaults: a 32-cubed coded volume in a 100 Å orthogonal cell,
/// f32 storage, block size 16, a single sampling level.
pub struct TestVolumeBuilder {
    extent: [u32; 3],
    cell: UnitCell,
    origin_frac: [f64; 3],
    box_frac: [f64; 3],
    value_type: ValueType,
    block_size: u32,
    max_levels: usize,
    data: Option<Vec<f32>>,
}

impl Default for TestVolumeBuilder {
    fn default() -> Self {
        Self {
            extent: [32, 32, 32],
            cell: UnitCell::orthogonal([100.0, 100.0, 100.0]),
            origin_frac: [0.0; 3],
            box_frac: [1.0; 3],
            value_type: ValueType::F32,
            block_size: 16,
            max_levels: 1,
            data: None,
        }
    }
}

impl TestVolumeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extent(mut self, extent: [u32; 3]) -> Self {
        self.extent = extent;
        self
    }

    pub fn cell(mut self, cell: UnitCell) -> Self {
        self.cell = cell;
        self
    }

    pub fn sub_box(mut self, origin_frac: [f64; 3], box_frac: [f64; 3]) -> Self {
        self.origin_frac = origin_frac;
        self.box_frac = box_frac;
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    /// Use explicit voxel data instead of the coded pattern.
    pub fn data(mut self, data: Vec<f32>) -> Self {
        self.data = Some(data);
        self
    }

    /// Use a Gaussian blob centered in the volume.
    pub fn gaussian(mut self, sigma: f64) -> Self {
        let center = [
            (self.extent[0] - 1) as f64 / 2.0,
            (self.extent[1] - 1) as f64 / 2.0,
            (self.extent[2] - 1) as f64 / 2.0,
        ];
        self.data = Some(gaussian_volume(self.extent, center, sigma));
        self
    }

    /// Write the volume into a fresh temporary directory.
    pub fn build(self) -> VolumeResult<TestVolume> {
        let dir = TempDir::new()?;
        let path = dir.path().join("volume.mdv");
        let data = self.data.unwrap_or_else(|| coded_volume(self.extent));

        MdvWriter::new(self.cell, self.origin_frac, self.box_frac)
            .with_value_type(self.value_type)
            .with_block_size(self.block_size)
            .write(&path, &data, self.extent, self.max_levels)?;

        Ok(TestVolume {
            dir,
            path,
            extent: self.extent,
            data,
        })
    }
}
