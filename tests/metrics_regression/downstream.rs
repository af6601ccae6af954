//! Downstream client metrics

use super::helpers::*;
use crate::common::Stub;
use serial_test::serial;
use storefront_aggregator::{
    CachingDiscipline, InventoryRequest, InventoryResponse, RequestContext,
    ResilientCachedClient, Sku,
};
use storefront_cache::CacheService;
use storefront_resilience::{PolicyConfig, ResilienceError, ResiliencePipeline};

#[tokio::test]
#[serial]
async fn answers_are_counted_by_quality() {
    init_recorder();

    let pipeline =
        ResiliencePipeline::from_configs([("metrics_stock", PolicyConfig::default())]).unwrap();
    let stub = Stub::ok(InventoryResponse {
        available_quantity: 4,
    });
    let client = ResilientCachedClient::builder("metrics_stock", InventoryResponse::fallback())
        .discipline(CachingDiscipline::FallbackOnly {
            max_staleness: None,
        })
        .build(
            &pipeline,
            CacheService::in_memory(8),
            |sku| InventoryRequest { sku },
            stub.clone(),
        )
        .unwrap();

    client.get(Sku(1), &RequestContext::new()).await;
    stub.respond(Err(ResilienceError::malformed("bad json")));
    client.get(Sku(1), &RequestContext::new()).await;

    assert_counter_exists("downstream_answers_total");
    assert_metric_has_label("downstream_answers_total", "policy", "metrics_stock");
    assert_metric_has_label("downstream_answers_total", "quality", "fresh");
    assert_metric_has_label("downstream_answers_total", "quality", "stale");
}
