//! The collaborator-facing processor trait.

use std::path::Path;

use async_trait::async_trait;

use density_protocol::{HeaderInfo, QueryResponse};
use volume_common::VolumeResult;

use crate::cache::CacheStats;
use crate::query::VolumeQuery;
use crate::service::VolumeDataService;

/// Trait for serving box queries against density volumes.
///
/// Transport layers (HTTP, CLI) depend on this seam rather than on
/// [`VolumeDataService`] directly, so tests can substitute a stub.
#[async_trait]
pub trait DensityProcessor: Send + Sync {
    /// Serve a box query from the file at `path`.
    async fn query(&self, query: &VolumeQuery, path: &Path) -> VolumeResult<QueryResponse>;

    /// The extended header document for a source.
    fn header_info(&self, source_id: &str, path: &Path) -> HeaderInfo;

    /// Get cache statistics for monitoring.
    fn cache_stats(&self) -> CacheStats;
}

#[async_trait]
impl DensityProcessor for VolumeDataService {
    async fn query(&self, query: &VolumeQuery, path: &Path) -> VolumeResult<QueryResponse> {
        VolumeDataService::query(self, query, path).await
    }

    fn header_info(&self, source_id: &str, path: &Path) -> HeaderInfo {
        VolumeDataService::header_info(self, source_id, path)
    }

    fn cache_stats(&self) -> CacheStats {
        VolumeDataService::cache_stats(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VolumeProcessorConfig;

    #[tokio::test]
    async fn test_service_usable_through_trait_object() {
        let service = VolumeDataService::new(VolumeProcessorConfig::default());
        let processor: &dyn DensityProcessor = &service;

        let info = processor.header_info("emdb/emd-404", Path::new("/no/such.mdv"));
        assert!(!info.is_available);
        assert_eq!(processor.cache_stats().entries, 0);
    }
}
