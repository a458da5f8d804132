//! Short-lived read-through cache in front of document fetches.
//!
//! Entries are keyed by `collection/id` and expire after a fixed TTL. Writes
//! never invalidate entries on their own: a caller that needs read-after-write
//! consistency must call [`DocumentCache::invalidate`].

use crate::common::{millis, DocumentRef, DocumentStore, DynClock};
use crate::domains::DynLogger;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const DEFAULT_CACHE_TTL_MS: u64 = 10_000;

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Option<Value>,
    stored_at: DateTime<Utc>,
}

/// Result of a cached read. `data == None` means "not found or failed to fetch".
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDocument {
    pub data: Option<Value>,
    pub from_cache: bool,
}

pub struct DocumentCache {
    store: Arc<dyn DocumentStore>,
    clock: DynClock,
    logger: DynLogger,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl DocumentCache {
    pub fn new(store: Arc<dyn DocumentStore>, clock: DynClock, logger: DynLogger, ttl_ms: u64) -> Self {
        Self {
            store,
            clock,
            logger,
            ttl: millis(ttl_ms),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn key(collection: &str, id: &str) -> String {
        format!("{}/{}", collection, id)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached document if it is younger than the TTL, otherwise fetches it.
    /// Fetch errors are logged and reported as `data: None` without being cached.
    pub async fn get(&self, collection: &str, id: &str) -> CachedDocument {
        let key = Self::key(collection, id);
        let now = self.clock.now();

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if now - entry.stored_at < self.ttl {
                    return CachedDocument {
                        data: entry.data.clone(),
                        from_cache: true,
                    };
                }
            }
        }

        match self.store.get(&DocumentRef::new(collection, id)).await {
            Ok(data) => {
                let mut entries = self.entries.write().await;
                entries.insert(
                    key,
                    CacheEntry {
                        data: data.clone(),
                        stored_at: self.clock.now(),
                    },
                );
                CachedDocument {
                    data,
                    from_cache: false,
                }
            }
            Err(e) => {
                self.logger.error(&format!("Failed to fetch {}: {}", key, e));
                CachedDocument {
                    data: None,
                    from_cache: false,
                }
            }
        }
    }

    /// Drops one entry, or every entry when `key` is `None`.
    pub async fn invalidate(&self, key: Option<&str>) {
        let mut entries = self.entries.write().await;
        match key {
            Some(key) => {
                entries.remove(key);
            }
            None => entries.clear(),
        }
    }

    pub async fn invalidate_document(&self, collection: &str, id: &str) {
        self.invalidate(Some(Self::key(collection, id).as_str())).await;
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl std::fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCache")
            .field("ttl_ms", &self.ttl.num_milliseconds())
            .field("entries", &"<HashMap<String, CacheEntry>>")
            .finish()
    }
}
