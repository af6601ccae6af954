//! Cache storage backends.

use crate::StoreError;
use futures::future::BoxFuture;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

/// A serialized value with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// JSON encoding of the cached value.
    pub payload: String,
    /// The entry is fresh strictly before this instant.
    pub expires_at: Instant,
}

impl StoredEntry {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Key/value backend used by [`CacheService`](crate::CacheService).
///
/// Implementations must return expired entries from `get_entry` for as long as they keep
/// them, since stale reads are decided by the service, not the store. A networked store
/// (Redis, Memcached) implements this trait over its client.
pub trait CacheStore: Send + Sync {
    /// Reads the entry stored under `key`, expired or not.
    fn get_entry<'a>(&'a self, key: &'a str)
        -> BoxFuture<'a, Result<Option<StoredEntry>, StoreError>>;

    /// Writes `entry` under `key`, replacing any previous entry.
    fn set<'a>(&'a self, key: &'a str, entry: StoredEntry) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Removes `key`. Returns whether an entry existed.
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, StoreError>>;
}

/// In-process store bounded by entry count with least-recently-used eviction.
///
/// Expired entries stay in place until they are overwritten, deleted or evicted.
pub struct InMemoryStore {
    entries: Mutex<LruCache<String, StoredEntry>>,
}

impl InMemoryStore {
    /// Creates a store holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of entries held, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, StoredEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.lock();
        f.debug_struct("InMemoryStore")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}

impl CacheStore for InMemoryStore {
    fn get_entry<'a>(
        &'a self,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<StoredEntry>, StoreError>> {
        let entry = self.lock().get(key).cloned();
        Box::pin(async move { Ok(entry) })
    }

    fn set<'a>(&'a self, key: &'a str, entry: StoredEntry) -> BoxFuture<'a, Result<(), StoreError>> {
        self.lock().put(key.to_string(), entry);
        Box::pin(async { Ok(()) })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, StoreError>> {
        let existed = self.lock().pop(key).is_some();
        Box::pin(async move { Ok(existed) })
    }
}
