//! Per-bucket region cache.
//!
//! The only mutable shared state in the client. Entries are inserted
//! when a `?location` lookup succeeds and removed whenever a request to
//! the bucket answers with an unexpected status or the bucket is
//! deleted, so the next request re-discovers the region. Stale reads
//! are tolerated; invalidation plus retry converges.

use std::collections::HashMap;
use std::sync::RwLock;

/// Region assumed when no bucket is involved or discovery yields
/// nothing.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Concurrent bucket-name to region-code mapping.
#[derive(Debug, Default)]
pub struct RegionCache {
    inner: RwLock<HashMap<String, String>>,
}

impl RegionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the cached region of a bucket.
    pub fn get(&self, bucket: &str) -> Option<String> {
        self.inner.read().expect("region cache poisoned").get(bucket).cloned()
    }

    /// Record the region of a bucket.
    pub fn insert(&self, bucket: &str, region: &str) {
        self.inner
            .write()
            .expect("region cache poisoned")
            .insert(bucket.to_string(), region.to_string());
    }

    /// Drop a bucket's entry.
    pub fn evict(&self, bucket: &str) {
        self.inner.write().expect("region cache poisoned").remove(bucket);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.read().expect("region cache poisoned").len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_evict() {
        let cache = RegionCache::new();
        assert!(cache.get("b").is_none());
        assert!(cache.is_empty());

        cache.insert("b", "eu-west-1");
        assert_eq!(cache.get("b").as_deref(), Some("eu-west-1"));
        assert_eq!(cache.len(), 1);

        cache.evict("b");
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn evict_missing_is_noop() {
        let cache = RegionCache::new();
        cache.evict("nope");
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_overwrites() {
        let cache = RegionCache::new();
        cache.insert("b", "us-west-2");
        cache.insert("b", "ap-northeast-1");
        assert_eq!(cache.get("b").as_deref(), Some("ap-northeast-1"));
        assert_eq!(cache.len(), 1);
    }
}
