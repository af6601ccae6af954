use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storefront_cache::{CacheService, CacheStore, InMemoryStore, StoreError, StoredEntry};

/// Delegates to an in-memory store unless switched off.
#[derive(Default)]
struct SwitchableStore {
    down: AtomicBool,
    inner: InMemoryStore,
}

impl SwitchableStore {
    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::unavailable("connection refused"))
        } else {
            Ok(())
        }
    }
}

impl CacheStore for SwitchableStore {
    fn get_entry<'a>(
        &'a self,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<StoredEntry>, StoreError>> {
        Box::pin(async move {
            self.check()?;
            self.inner.get_entry(key).await
        })
    }

    fn set<'a>(&'a self, key: &'a str, entry: StoredEntry) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.check()?;
            self.inner.set(key, entry).await
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move {
            self.check()?;
            self.inner.delete(key).await
        })
    }
}

#[tokio::test]
async fn outage_looks_like_a_miss_and_recovers() {
    let store = Arc::new(SwitchableStore::default());
    let cache = CacheService::from_shared(store.clone() as Arc<dyn CacheStore>);

    assert!(cache.put("price:sku:1", &"9.99", Duration::from_secs(60)).await);

    store.down.store(true, Ordering::SeqCst);
    assert_eq!(cache.get::<String>("price:sku:1").await, None);
    assert_eq!(cache.get_stale::<String>("price:sku:1", None).await, None);
    assert!(!cache.put("price:sku:1", &"8.99", Duration::from_secs(60)).await);
    assert!(!cache.delete("price:sku:1").await);

    store.down.store(false, Ordering::SeqCst);
    assert_eq!(cache.get::<String>("price:sku:1").await.as_deref(), Some("9.99"));
}
