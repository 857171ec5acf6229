mod disk;
mod gateway;
mod key;
mod memory;

pub use disk::DiskCache;
pub use gateway::{CancelFlag, TranslationGateway};
pub use key::CacheKey;
pub use memory::MemoryCache;

use tracing::warn;

use crate::config::CacheConfig;
use crate::error::Result;

/// Combined cache with memory and disk layers.
///
/// Entries are append-only: once a key holds a value, later inserts for that
/// key leave it untouched and get the stored value back.
pub struct TranslationCache {
    memory: Option<MemoryCache>,
    disk: Option<DiskCache>,
}

impl TranslationCache {
    /// Create a new translation cache from configuration
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let memory = config
            .memory_enabled
            .then(|| MemoryCache::new(config.memory_max_entries));

        let disk = if config.disk_enabled {
            Some(DiskCache::new(config.resolved_disk_path())?)
        } else {
            None
        };

        Ok(Self { memory, disk })
    }

    /// Drop every entry of the configured disk tier without building a cache.
    ///
    /// Returns how many entries were removed; a cache that was never created
    /// counts as empty.
    pub fn clear_disk(config: &CacheConfig) -> Result<usize> {
        let path = config.resolved_disk_path();
        if !path.exists() {
            return Ok(0);
        }
        DiskCache::new(&path)?.clear()
    }

    /// A cache that stores nothing; every lookup misses.
    pub const fn disabled() -> Self {
        Self { memory: None, disk: None }
    }

    /// Get a cached translation
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        if let Some(ref memory) = self.memory
            && let Some(value) = memory.get(key.as_str()).await
        {
            return Some(value);
        }

        if let Some(ref disk) = self.disk
            && let Some(value) = disk.get(key.as_str())
        {
            // Populate memory cache on disk hit
            if let Some(ref memory) = self.memory {
                return Some(memory.insert_if_absent(key.to_string(), value).await);
            }
            return Some(value);
        }

        None
    }

    /// Store a translation unless one is already present.
    ///
    /// Returns the value the cache holds for `key` afterwards. A failed disk
    /// write is logged and the memory tier still serves the entry.
    pub async fn insert(&self, key: &CacheKey, value: String) -> String {
        let value = match self.disk {
            Some(ref disk) => match disk.insert_if_absent(key.as_str(), &value) {
                Ok(persisted) => persisted,
                Err(e) => {
                    warn!("Failed to persist translation {}: {}", key, e);
                    value
                }
            },
            None => value,
        };

        match self.memory {
            Some(ref memory) => memory.insert_if_absent(key.to_string(), value).await,
            None => value,
        }
    }

    /// Number of stored entries, counted on the authoritative tier.
    pub async fn len(&self) -> u64 {
        if let Some(ref disk) = self.disk {
            return disk.len() as u64;
        }
        match self.memory {
            Some(ref memory) => memory.entry_count().await,
            None => 0,
        }
    }

    /// Clear all caches
    pub fn clear(&self) -> Result<()> {
        if let Some(ref memory) = self.memory {
            memory.clear();
        }

        if let Some(ref disk) = self.disk {
            disk.clear()?;
        }
        Ok(())
    }
}
