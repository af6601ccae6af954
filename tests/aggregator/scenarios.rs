use super::{harness, widget};
use crate::common::capture_logs;
use std::time::Duration;
use storefront_aggregator::{
    AnswerQuality, InventoryResponse, MerchandiseResponse, RequestContext, Sku,
};
use storefront_cache::CacheKey;
use storefront_resilience::{CircuitState, ResilienceError};

#[tokio::test(start_paused = true)]
async fn cached_merchandise_is_served_without_a_remote_call() {
    let h = harness();
    h.merchandise
        .respond(Err(ResilienceError::server(500, "must not be called")));
    h.cache
        .put(
            CacheKey::for_sku("merchandise", 12345).as_str(),
            &widget(),
            Duration::from_secs(15 * 60),
        )
        .await;

    let product = h
        .aggregator
        .get_composite(Sku(12345), &RequestContext::new())
        .await;

    assert_eq!(product.name, "Widget");
    assert_eq!(product.quality.merchandise, AnswerQuality::Cached);
    assert_eq!(h.merchandise.calls(), 0);
    assert_eq!(
        h.pipeline.circuit_state("merchandise"),
        Some(CircuitState::Closed)
    );
}

#[tokio::test(start_paused = true)]
async fn merchandise_fetched_once_is_cached_for_fifteen_minutes() {
    let h = harness();
    let key = CacheKey::for_sku("merchandise", 12345);

    let first = h
        .aggregator
        .get_composite(Sku(12345), &RequestContext::new())
        .await;
    assert_eq!(first.name, "Widget");
    assert_eq!(first.quality.merchandise, AnswerQuality::Fresh);
    assert_eq!(h.merchandise.calls(), 1);
    assert_eq!(
        h.cache.get::<MerchandiseResponse>(key.as_str()).await,
        Some(widget())
    );
    assert_eq!(
        h.pipeline.circuit_state("merchandise"),
        Some(CircuitState::Closed)
    );

    tokio::time::advance(Duration::from_secs(15 * 60 - 1)).await;
    let cached = h
        .aggregator
        .get_composite(Sku(12345), &RequestContext::new())
        .await;
    assert_eq!(cached.name, "Widget");
    assert_eq!(cached.quality.merchandise, AnswerQuality::Cached);
    assert_eq!(h.merchandise.calls(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    let refreshed = h
        .aggregator
        .get_composite(Sku(12345), &RequestContext::new())
        .await;
    assert_eq!(refreshed.quality.merchandise, AnswerQuality::Fresh);
    assert_eq!(h.merchandise.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn inventory_timing_out_without_cache_is_backordered() {
    let h = harness();
    h.inventory.hang_for(Duration::from_secs(5));

    let product = h
        .aggregator
        .get_composite(Sku(777), &RequestContext::new())
        .await;

    assert_eq!(h.inventory.calls(), 3);
    assert_eq!(product.available_quantity, -1);
    assert_eq!(product.quality.inventory, AnswerQuality::Sentinel);
    assert_eq!(product.name, "Widget");
    assert_eq!(product.price, "19.99");
}

#[tokio::test(start_paused = true)]
async fn inventory_failure_after_a_success_serves_the_cached_count() {
    let (logs, _guard) = capture_logs();
    let h = harness();
    h.inventory.respond(Ok(InventoryResponse {
        available_quantity: 5,
    }));
    let ctx = RequestContext::new().with_store_number(42);

    let first = h.aggregator.get_composite(Sku(31), &ctx).await;
    assert_eq!(first.available_quantity, 5);
    assert_eq!(first.quality.inventory, AnswerQuality::Fresh);

    h.inventory
        .respond(Err(ResilienceError::connection("connection reset")));
    let second = h.aggregator.get_composite(Sku(31), &ctx).await;

    assert_eq!(second.available_quantity, 5);
    assert_eq!(second.quality.inventory, AnswerQuality::Stale);
    let fallback = logs.lines_with("used cached fallback");
    assert_eq!(fallback.len(), 1);
    assert!(fallback[0].contains("policy=inventory"), "{}", fallback[0]);
    assert!(fallback[0].contains("circuit_state=CLOSED"), "{}", fallback[0]);
    assert!(fallback[0].contains("store_number=42"), "{}", fallback[0]);
    assert_eq!(logs.lines_with("assembled degraded product").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn price_outage_yields_zero_price_and_keeps_other_branches() {
    let h = harness();
    h.price.respond(Err(ResilienceError::server(502, "bad gateway")));

    let product = h.aggregator.get_composite(Sku(5), &RequestContext::new()).await;

    assert_eq!(product.price, "0.00");
    assert_eq!(product.original_price, "0.00");
    assert_eq!(product.currency, "USD");
    assert_eq!(product.quality.price, AnswerQuality::Sentinel);
    assert_eq!(product.name, "Widget");
    assert_eq!(product.available_quantity, 10);
}
