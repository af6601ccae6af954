use futures::future::join_all;
use std::time::Duration;
use storefront_cache::{CacheKey, CacheService};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_leave_one_complete_value() {
    let cache = CacheService::in_memory(1_000);
    let key = CacheKey::for_sku("inventory", 77);

    let writers = (0..50_i64).map(|n| {
        let cache = cache.clone();
        let key = key.clone();
        tokio::spawn(async move { cache.put(key.as_str(), &n, Duration::from_secs(30)).await })
    });
    for written in join_all(writers).await {
        assert!(written.unwrap());
    }

    let value = cache.get::<i64>(key.as_str()).await.unwrap();
    assert!((0..50).contains(&value));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_and_writers_on_distinct_keys() {
    let cache = CacheService::in_memory(1_000);

    let tasks = (0..100_u64).map(|sku| {
        let cache = cache.clone();
        tokio::spawn(async move {
            let key = CacheKey::for_sku("price", sku);
            cache.put(key.as_str(), &sku, Duration::from_secs(60)).await;
            cache.get::<u64>(key.as_str()).await
        })
    });

    for (sku, read) in join_all(tasks).await.into_iter().enumerate() {
        assert_eq!(read.unwrap(), Some(sku as u64));
    }
}
