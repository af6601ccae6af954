//! Cache metrics

use super::helpers::*;
use serial_test::serial;
use std::time::Duration;
use storefront_cache::CacheService;

#[tokio::test]
#[serial]
async fn cache_results_are_labelled() {
    init_recorder();

    let cache = CacheService::in_memory(8);
    let _ = cache.get::<String>("price:sku:1").await;
    cache.put("price:sku:1", &"1.00", Duration::from_secs(60)).await;
    let _ = cache.get::<String>("price:sku:1").await;

    assert_counter_exists("cache_requests_total");
    assert_metric_has_label("cache_requests_total", "result", "miss");
    assert_metric_has_label("cache_requests_total", "result", "hit");
}
