use moka::future::Cache;

/// In-memory tier, bounded by entry count.
///
/// Evictions only drop the fast copy; the disk tier stays authoritative.
pub struct MemoryCache {
    cache: Cache<String, String>,
}

impl MemoryCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_entries).build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await
    }

    /// Store `value` unless the key is already present; returns the stored value.
    pub async fn insert_if_absent(&self, key: String, value: String) -> String {
        self.cache.entry(key).or_insert(value).await.into_value()
    }

    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}
