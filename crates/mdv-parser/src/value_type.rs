//! On-disk element types and their f32 upconversion.

use serde::{Deserialize, Serialize};

use volume_common::{VolumeError, VolumeResult};

/// Element type of the stored voxel values.
///
/// Queries always exchange `f32`; narrower on-disk types are upconverted
/// on read, preserving exact representable values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    U8,
    I16,
    F32,
}

impl ValueType {
    /// Parse the header tag.
    pub fn from_tag(tag: u32) -> VolumeResult<Self> {
        match tag {
            0 => Ok(Self::U8),
            1 => Ok(Self::I16),
            2 => Ok(Self::F32),
            other => Err(VolumeError::format(format!(
                "unknown value type tag {}",
                other
            ))),
        }
    }

    /// Tag written into the header.
    pub fn tag(&self) -> u32 {
        match self {
            Self::U8 => 0,
            Self::I16 => 1,
            Self::F32 => 2,
        }
    }

    /// Bytes per stored element.
    pub fn byte_size(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 => 2,
            Self::F32 => 4,
        }
    }

    /// Decode a raw block payload into f32 values.
    ///
    /// The payload length must be an exact multiple of the element size;
    /// a remainder means the block was truncated on disk.
    pub fn decode(&self, raw: &[u8]) -> VolumeResult<Vec<f32>> {
        let elem = self.byte_size();
        if raw.len() % elem != 0 {
            return Err(VolumeError::truncated(format!(
                "payload of {} bytes is not a multiple of element size {}",
                raw.len(),
                elem
            )));
        }

        let count = raw.len() / elem;
        let mut out = Vec::with_capacity(count);
        match self {
            Self::U8 => out.extend(raw.iter().map(|&b| b as f32)),
            Self::I16 => {
                for pair in raw.chunks_exact(2) {
                    out.push(i16::from_le_bytes([pair[0], pair[1]]) as f32);
                }
            }
            Self::F32 => {
                for quad in raw.chunks_exact(4) {
                    out.push(f32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]));
                }
            }
        }
        Ok(out)
    }

    /// Encode f32 values into the on-disk representation.
    ///
    /// Narrow types clamp and round; used by the writer, which expects
    /// already-quantized inputs when a narrow type is chosen.
    pub fn encode(&self, values: &[f32], out: &mut Vec<u8>) {
        match self {
            Self::U8 => {
                out.extend(values.iter().map(|&v| v.round().clamp(0.0, 255.0) as u8));
            }
            Self::I16 => {
                for &v in values {
                    let q = v.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                    out.extend_from_slice(&q.to_le_bytes());
                }
            }
            Self::F32 => {
                for &v in values {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
    }
}
