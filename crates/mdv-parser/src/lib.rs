//! MDV (multi-resolution density volume) file format.
//!
//! MDV stores a 3D scalar field at several downsampling rates so that
//! sub-region queries can be served with bounded I/O: each sampling
//! level is tiled into cubic blocks, and a per-level block index maps
//! block coordinates to byte ranges for positioned reads.
//!
//! # File layout (all integers little-endian, floats IEEE-754 LE)
//!
//! ```text
//! Preamble (16 bytes)
//!   magic            b"MDV1"
//!   format_version   u32      (supported: 1)
//!   value_type       u32      (0 = u8, 1 = i16, 2 = f32)
//!   level_count      u32      (>= 1)
//! Cell/grid header
//!   spacegroup       u32
//!   cell_size        3 x f64  (angstroms)
//!   cell_angles      3 x f64  (radians)
//!   grid_extent      3 x u32  (finest-level full-cell grid size)
//!   origin_frac      3 x f64  (fractional origin of the stored box)
//!   box_frac         3 x f64  (fractional extent, all components > 0)
//! Per level, finest -> coarsest (rates 1, 2, 4, ...)
//!   rate             u32
//!   sample_count     3 x u32
//!   block_size       u32      (> 0, cubic block edge)
//!   stats            4 x f64  (min, max, mean, sigma)
//!   block_count      u32
//!   block index      block_count x (offset u64, len u64)
//!                    z-major, then y, then x block order
//! Block payloads
//!   raw values of the on-disk element type, x fastest within a block;
//!   edge blocks store only their in-range voxels (no padding)
//! ```
//!
//! The on-disk element type may be narrower than the `f32` interchange
//! type; decoding upconverts and preserves every representable value.

pub mod extended;
pub mod header;
pub mod index;
pub mod value_type;
pub mod writer;

mod downsample;

pub use extended::{available_precisions, PrecisionTier, INCLUDE_FIRST_EXCEEDING_TIER};
pub use header::{block_grid, read_header, Header, HeaderSummary, LevelSummary, SamplingLevel};
pub use index::{blocks_overlapping, BlockCoord, BlockIndex, ByteRange};
pub use value_type::ValueType;
pub use writer::MdvWriter;

/// Magic bytes at the start of every MDV file.
pub const MAGIC: [u8; 4] = *b"MDV1";

/// The only format version this parser understands.
pub const FORMAT_VERSION: u32 = 1;
