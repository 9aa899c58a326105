//! LRU cache for decoded volume blocks.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use serde::{Deserialize, Serialize};

/// Cache key for blocks: (file_path_hash, level, block_x, block_y, block_z).
pub type BlockKey = (u64, usize, u32, u32, u32);

/// Cache statistics snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub memory_bytes: u64,
    pub evictions: u64,
}

/// LRU cache for decoded blocks with memory-bounded eviction.
///
/// Blocks are cached after decoding to f32, so a hit skips both the
/// disk read and the value-type conversion.
pub struct BlockCache {
    cache: LruCache<BlockKey, Vec<f32>>,
    memory_limit: usize,
    current_memory: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl BlockCache {
    /// Create a new block cache with the given memory limit in bytes.
    pub fn new(memory_limit: usize) -> Self {
        // Entry-count ceiling assuming ~128KB per block (32^3 f32 voxels);
        // the real bound is the memory accounting below.
        let block_size_estimate = 32 * 32 * 32 * 4;
        let max_entries = (memory_limit / block_size_estimate).max(16);
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: LruCache::new(capacity),
            memory_limit,
            current_memory: 0,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Try to get a block from the cache.
    pub fn get(&mut self, key: &BlockKey) -> Option<&Vec<f32>> {
        if let Some(data) = self.cache.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(data)
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Insert a block, evicting least recently used entries to fit.
    pub fn insert(&mut self, key: BlockKey, data: Vec<f32>) {
        let data_size = data.len() * std::mem::size_of::<f32>();

        while self.current_memory + data_size > self.memory_limit && !self.cache.is_empty() {
            if let Some((_, evicted)) = self.cache.pop_lru() {
                let evicted_size = evicted.len() * std::mem::size_of::<f32>();
                self.current_memory = self.current_memory.saturating_sub(evicted_size);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        if data_size <= self.memory_limit {
            // push reports whatever it displaced, whether that is the
            // previous value under this key or an entry evicted because
            // the entry-count capacity was hit.
            if let Some((displaced_key, displaced)) = self.cache.push(key, data) {
                let displaced_size = displaced.len() * std::mem::size_of::<f32>();
                self.current_memory = self.current_memory.saturating_sub(displaced_size);
                if displaced_key != key {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
            }
            self.current_memory += data_size;
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
            memory_bytes: self.current_memory as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Drop every entry belonging to one file.
    ///
    /// Used when a file turns out to be corrupt: stale decoded blocks
    /// must not outlive the verdict on their source.
    pub fn invalidate_file(&mut self, path_hash: u64) -> usize {
        let stale: Vec<BlockKey> = self
            .cache
            .iter()
            .filter(|(key, _)| key.0 == path_hash)
            .map(|(key, _)| *key)
            .collect();
        for key in &stale {
            if let Some(data) = self.cache.pop(key) {
                let size = data.len() * std::mem::size_of::<f32>();
                self.current_memory = self.current_memory.saturating_sub(size);
            }
        }
        stale.len()
    }

    /// Clear all entries from the cache.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.current_memory = 0;
    }

    /// Get the current memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    /// Get the memory limit in bytes.
    pub fn memory_limit(&self) -> usize {
        self.memory_limit
    }

    /// Get the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Hash a file path for use in cache keys.
pub fn hash_path(path: &std::path::Path) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_cache_insert_and_get() {
        let mut cache = BlockCache::new(1024 * 1024);

        let key = (123, 0, 0, 0, 0);
        let data: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0];

        assert!(cache.get(&key).is_none());
        cache.insert(key, data.clone());
        assert_eq!(cache.get(&key), Some(&data));
    }

    #[test]
    fn test_cache_lru_eviction() {
        let mut cache = BlockCache::new(64);

        for i in 0..10 {
            let key = (0, 0, i, 0, 0);
            let data: Vec<f32> = vec![i as f32; 4];
            cache.insert(key, data);
        }

        assert!(cache.get(&(0, 0, 0, 0, 0)).is_none());
        assert!(cache.get(&(0, 0, 9, 0, 0)).is_some());
        assert!(cache.stats().evictions > 0);
    }

    #[test]
    fn test_cache_stats() {
        let mut cache = BlockCache::new(1024 * 1024);
        cache.insert((0, 0, 0, 0, 0), vec![1.0, 2.0]);

        cache.get(&(0, 0, 0, 0, 0));
        cache.get(&(0, 1, 0, 0, 0));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_capacity_eviction_keeps_accounting_exact() {
        // Generous memory limit, so the entry-count ceiling (16) is the
        // only bound that trips; accounting must follow those evictions.
        let mut cache = BlockCache::new(1024 * 1024);

        for i in 0..17 {
            cache.insert((0, 0, i, 0, 0), vec![0.0; 100]);
        }

        assert_eq!(cache.len(), 16);
        assert_eq!(cache.memory_usage(), 16 * 400);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_reinsert_same_key_accounts_once() {
        let mut cache = BlockCache::new(1024 * 1024);
        cache.insert((0, 0, 0, 0, 0), vec![1.0; 100]);
        cache.insert((0, 0, 0, 0, 0), vec![2.0; 50]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.memory_usage(), 200);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_invalidate_file() {
        let mut cache = BlockCache::new(1024 * 1024);
        cache.insert((1, 0, 0, 0, 0), vec![1.0; 8]);
        cache.insert((1, 1, 0, 0, 0), vec![2.0; 8]);
        cache.insert((2, 0, 0, 0, 0), vec![3.0; 8]);

        assert_eq!(cache.invalidate_file(1), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&(2, 0, 0, 0, 0)).is_some());
        assert_eq!(cache.memory_usage(), 32);
    }

    #[test]
    fn test_hash_path_is_stable() {
        let a = hash_path(Path::new("/data/emd-1234.mdv"));
        let b = hash_path(Path::new("/data/emd-1234.mdv"));
        let c = hash_path(Path::new("/data/emd-5678.mdv"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
