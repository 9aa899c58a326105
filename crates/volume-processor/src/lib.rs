//! Query processing for multi-resolution density volumes.
//!
//! This crate turns a box query into voxel data: it picks the sampling
//! level that fits the requested detail, maps the box onto that level's
//! grid, reads the covering blocks concurrently, and assembles the
//! exact crop with recomputed statistics.
//!
//! [`VolumeDataService`] is the entry point; the lower layers
//! ([`select_level`], [`to_voxel_range`], [`BlockReader`]) are public
//! for direct use and testing.

pub mod cache;
pub mod config;
pub mod level;
pub mod mapper;
pub mod processor;
pub mod query;
pub mod reader;
pub mod service;
pub mod source;

pub use cache::{hash_path, BlockCache, BlockKey, CacheStats};
pub use config::VolumeProcessorConfig;
pub use level::select_level;
pub use mapper::to_voxel_range;
pub use processor::DensityProcessor;
pub use query::VolumeQuery;
pub use reader::BlockReader;
pub use service::VolumeDataService;
pub use source::VolumeFile;
