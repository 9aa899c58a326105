//! Exchange format for volumetric density query results.
//!
//! A query result is serialized as a self-describing document carrying
//! the cell geometry, the queried box, the resolved sampling level, the
//! cropped grid dimensions, recomputed value statistics, and the voxel
//! values. Two encodings exist:
//!
//! - **text** (`.dvtxt`): line-oriented, human-diffable, one value per
//!   line at fixed precision;
//! - **binary** (`.dvbin`): packed little-endian with a typed f32 array.
//!
//! Both encoders stream incrementally to any [`tokio::io::AsyncWrite`]
//! and are byte-for-byte reproducible for identical input. Matching
//! decoders exist for clients and round-trip tests.

pub mod filename;
pub mod info;
pub mod response;
pub mod wire;

pub use filename::output_filename;
pub use info::HeaderInfo;
pub use response::QueryResponse;
pub use wire::{
    decode_binary, decode_text, encode_binary, encode_text, WireError, BINARY_MAGIC,
    TEXT_PREAMBLE,
};
