//! High-level volume data service.
//!
//! The `VolumeDataService` is the primary interface for serving box
//! queries: it keeps a registry of opened files, shares one block cache
//! across all of them, and turns a [`VolumeQuery`] into an encoded
//! result document.
//!
//! # Example
//!
//! ```rust,ignore
//! use volume_processor::{VolumeDataService, VolumeProcessorConfig, VolumeQuery};
//!
//! let service = VolumeDataService::new(VolumeProcessorConfig::from_env());
//!
//! let query = VolumeQuery::new("emdb", "emd-1234")
//!     .with_box(QueryBox::cartesian([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]))
//!     .with_detail(Detail::Precision(2));
//!
//! let response = service.query(&query, Path::new("/data/emd-1234.mdv")).await?;
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use tokio::io::AsyncWrite;

use density_protocol::{encode_binary, encode_text, HeaderInfo, QueryResponse};
use volume_common::{OutputEncoding, ValueStats, VolumeError, VolumeResult};

use crate::cache::{BlockCache, CacheStats};
use crate::config::VolumeProcessorConfig;
use crate::level::select_level;
use crate::mapper::to_voxel_range;
use crate::query::VolumeQuery;
use crate::reader::BlockReader;
use crate::source::VolumeFile;

/// Serves box queries against a set of MDV files.
///
/// Files are opened lazily and kept in a registry keyed by path; the
/// parsed header is reused by every later query. A file whose data
/// turns out corrupt or vanished is evicted together with its cached
/// blocks, so the next query re-opens and re-validates it.
pub struct VolumeDataService {
    config: VolumeProcessorConfig,
    cache: Arc<Mutex<BlockCache>>,
    reader: BlockReader,
    files: RwLock<HashMap<PathBuf, Arc<VolumeFile>>>,
}

impl VolumeDataService {
    /// Create a service with the given configuration.
    pub fn new(config: VolumeProcessorConfig) -> Self {
        let cache = Arc::new(Mutex::new(BlockCache::new(config.block_cache_size_bytes())));
        let reader = BlockReader::new(Arc::clone(&cache), config.read_concurrency);
        Self {
            config,
            cache,
            reader,
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Open a file or reuse the already-open handle.
    pub fn open_or_reuse(&self, path: &Path) -> VolumeResult<Arc<VolumeFile>> {
        {
            let files = self
                .files
                .read()
                .map_err(|_| VolumeError::Io("file registry lock poisoned".to_string()))?;
            if let Some(file) = files.get(path) {
                return Ok(Arc::clone(file));
            }
        }

        let file = Arc::new(VolumeFile::open(path)?);
        let mut files = self
            .files
            .write()
            .map_err(|_| VolumeError::Io("file registry lock poisoned".to_string()))?;
        // A concurrent open may have won; keep the registered handle.
        Ok(Arc::clone(
            files.entry(path.to_owned()).or_insert(file),
        ))
    }

    /// Drop a file from the registry along with its cached blocks.
    pub fn evict(&self, path: &Path) {
        if let Ok(mut files) = self.files.write() {
            files.remove(path);
        }
        if let Ok(mut cache) = self.cache.lock() {
            let dropped = cache.invalidate_file(crate::cache::hash_path(path));
            tracing::warn!(path = %path.display(), dropped, "evicted volume file");
        }
    }

    /// Serve a box query from the file at `path`.
    pub async fn query(&self, query: &VolumeQuery, path: &Path) -> VolumeResult<QueryResponse> {
        let result = self.query_inner(query, path).await;
        if let Err(e) = &result {
            if e.invalidates_file() {
                self.evict(path);
            }
        }
        result
    }

    async fn query_inner(
        &self,
        query: &VolumeQuery,
        path: &Path,
    ) -> VolumeResult<QueryResponse> {
        let file = self.open_or_reuse(path)?;
        let header = file.header();

        let level = select_level(
            header,
            &query.query_box,
            &query.detail,
            &self.config.voxel_budgets,
        )?;
        let range = to_voxel_range(header, &query.query_box, level)?;

        let values = self.reader.read_range(&file, level, &range).await?;
        let stats = ValueStats::from_values(&values);

        tracing::info!(
            source = %query.source,
            id = %query.id,
            level,
            rate = header.levels[level].rate,
            voxels = values.len(),
            "served box query"
        );

        Ok(QueryResponse {
            source_id: format!("{}/{}", query.source, query.id),
            cell: header.cell,
            query_box: query.query_box,
            level,
            rate: header.levels[level].rate,
            origin: range.min,
            dims: range.dims(),
            stats,
            values,
        })
    }

    /// Serve a query and stream the encoded document to `writer`.
    pub async fn query_to_writer<W>(
        &self,
        query: &VolumeQuery,
        path: &Path,
        writer: &mut W,
    ) -> VolumeResult<QueryResponse>
    where
        W: AsyncWrite + Unpin,
    {
        let response = self.query(query, path).await?;
        match query.encoding {
            OutputEncoding::Text => encode_text(&response, writer).await?,
            OutputEncoding::Binary => encode_binary(&response, writer).await?,
        }
        Ok(response)
    }

    /// The extended header document for a source.
    ///
    /// Never fails: a missing or unreadable file produces a document
    /// with `is_available: false`.
    pub fn header_info(&self, source_id: &str, path: &Path) -> HeaderInfo {
        match self.open_or_reuse(path) {
            Ok(file) => {
                HeaderInfo::from_header(source_id, file.header(), &self.config.voxel_budgets)
            }
            Err(e) => {
                tracing::debug!(source = source_id, error = %e, "header info unavailable");
                HeaderInfo::unavailable(source_id)
            }
        }
    }

    /// Snapshot of block cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .lock()
            .map(|c| c.stats())
            .unwrap_or_default()
    }

    pub fn config(&self) -> &VolumeProcessorConfig {
        &self.config
    }
}
