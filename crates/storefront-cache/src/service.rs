use crate::store::{CacheStore, InMemoryStore, StoredEntry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

#[cfg(feature = "metrics")]
use metrics::counter;

/// Best-effort typed cache over a [`CacheStore`].
///
/// No method fails: store errors and undecodable payloads are logged and reported as a
/// miss (`None`) or as `false`. Values are stored as JSON.
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn CacheStore>,
}

impl CacheService {
    pub fn new<S>(store: S) -> Self
    where
        S: CacheStore + 'static,
    {
        Self {
            store: Arc::new(store),
        }
    }

    /// Shares an existing store, e.g. one a test also inspects directly.
    pub fn from_shared(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// An in-process cache holding up to `capacity` entries.
    pub fn in_memory(capacity: usize) -> Self {
        Self::new(InMemoryStore::new(capacity))
    }

    /// Returns the value under `key` if present and not expired.
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let entry = self.read(key).await?;
        if entry.is_expired_at(Instant::now()) {
            debug!(key, "cache miss (expired)");
            record("miss");
            return None;
        }
        let value = decode(key, &entry)?;
        debug!(key, "cache hit");
        record("hit");
        Some(value)
    }

    /// Returns the value under `key` even if it has expired, provided it expired no more
    /// than `max_staleness` ago. `None` accepts any age.
    ///
    /// Only for answering when the source of truth has failed; a fresh value is always
    /// preferred by the caller.
    pub async fn get_stale<T>(&self, key: &str, max_staleness: Option<Duration>) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let entry = self.read(key).await?;
        let now = Instant::now();
        if entry.is_expired_at(now) {
            let expired_for = now.saturating_duration_since(entry.expires_at);
            if max_staleness.is_some_and(|limit| expired_for > limit) {
                debug!(key, ?expired_for, "cache miss (too stale)");
                record("miss");
                return None;
            }
            let value = decode(key, &entry)?;
            debug!(key, ?expired_for, "stale cache hit");
            record("stale_hit");
            return Some(value);
        }
        let value = decode(key, &entry)?;
        debug!(key, "cache hit");
        record("hit");
        Some(value)
    }

    /// Stores `value` under `key` for `ttl`. Returns whether the write succeeded.
    pub async fn put<T>(&self, key: &str, value: &T, ttl: Duration) -> bool
    where
        T: Serialize + ?Sized,
    {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(key, %error, "failed to encode value for cache");
                record("error");
                return false;
            }
        };
        let entry = StoredEntry {
            payload,
            expires_at: Instant::now() + ttl,
        };
        match self.store.set(key, entry).await {
            Ok(()) => {
                debug!(key, ttl_ms = ttl.as_millis() as u64, "cache put");
                true
            }
            Err(error) => {
                warn!(key, %error, "cache SET failed");
                record("error");
                false
            }
        }
    }

    /// Removes `key`. Returns true only if an entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(existed) => {
                if existed {
                    debug!(key, "cache delete");
                }
                existed
            }
            Err(error) => {
                warn!(key, %error, "cache DELETE failed");
                record("error");
                false
            }
        }
    }

    async fn read(&self, key: &str) -> Option<StoredEntry> {
        match self.store.get_entry(key).await {
            Ok(Some(entry)) => Some(entry),
            Ok(None) => {
                debug!(key, "cache miss");
                record("miss");
                None
            }
            Err(error) => {
                warn!(key, %error, "cache GET failed");
                record("error");
                None
            }
        }
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService").finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(key: &str, entry: &StoredEntry) -> Option<T> {
    match serde_json::from_str(&entry.payload) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, %error, "failed to decode cached value");
            record("error");
            None
        }
    }
}

#[cfg(feature = "metrics")]
fn record(result: &'static str) {
    counter!("cache_requests_total", "result" => result).increment(1);
}

#[cfg(not(feature = "metrics"))]
fn record(_result: &'static str) {}
