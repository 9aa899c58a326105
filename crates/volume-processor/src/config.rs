//! Configuration for the volume processor.

use serde::{Deserialize, Serialize};

use volume_common::DEFAULT_VOXEL_BUDGETS;

/// Configuration for the volume processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeProcessorConfig {
    /// Memory budget for the block cache in megabytes.
    pub block_cache_size_mb: usize,

    /// Maximum block reads in flight per query.
    pub read_concurrency: usize,

    /// Voxel budget per detail level, finest detail first.
    pub voxel_budgets: Vec<u64>,
}

impl Default for VolumeProcessorConfig {
    fn default() -> Self {
        Self {
            block_cache_size_mb: 1024,
            read_concurrency: 8,
            voxel_budgets: DEFAULT_VOXEL_BUDGETS.to_vec(),
        }
    }
}

impl VolumeProcessorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("BLOCK_CACHE_SIZE_MB") {
            if let Ok(size) = val.parse() {
                config.block_cache_size_mb = size;
            }
        }

        if let Ok(val) = std::env::var("READ_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                config.read_concurrency = n;
            }
        }

        if let Ok(val) = std::env::var("VOXEL_BUDGETS") {
            let parsed: Result<Vec<u64>, _> =
                val.split(',').map(|t| t.trim().parse()).collect();
            if let Ok(budgets) = parsed {
                if !budgets.is_empty() {
                    config.voxel_budgets = budgets;
                }
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.block_cache_size_mb == 0 {
            return Err("block_cache_size_mb must be > 0".to_string());
        }

        if self.read_concurrency == 0 {
            return Err("read_concurrency must be > 0".to_string());
        }

        if self.voxel_budgets.is_empty() {
            return Err("voxel_budgets must not be empty".to_string());
        }

        if self.voxel_budgets.windows(2).any(|w| w[0] >= w[1]) {
            return Err("voxel_budgets must be strictly increasing".to_string());
        }

        Ok(())
    }

    /// Get the block cache size in bytes.
    pub fn block_cache_size_bytes(&self) -> usize {
        self.block_cache_size_mb * 1024 * 1024
    }
}
