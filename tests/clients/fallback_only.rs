use crate::common::{capture_logs, quick_policy, Stub};
use std::time::Duration;
use storefront_aggregator::{
    AnswerQuality, CachingDiscipline, InventoryClient, InventoryRequest, InventoryResponse,
    RequestContext, ResilientCachedClient, Sku, BACKORDERED,
};
use storefront_cache::{CacheKey, CacheService};
use storefront_resilience::{CircuitState, ResilienceError, ResiliencePipeline};

fn stock(available_quantity: i64) -> InventoryResponse {
    InventoryResponse { available_quantity }
}

fn inventory_client(
    pipeline: &ResiliencePipeline,
    cache: CacheService,
    stub: &Stub<InventoryResponse>,
    max_staleness: Option<Duration>,
) -> InventoryClient {
    ResilientCachedClient::builder("inventory", InventoryResponse::fallback())
        .discipline(CachingDiscipline::FallbackOnly { max_staleness })
        .ttl(Duration::from_secs(30))
        .build(pipeline, cache, |sku| InventoryRequest { sku }, stub.clone())
        .unwrap()
}

fn pipeline() -> ResiliencePipeline {
    ResiliencePipeline::from_configs([("inventory", quick_policy())]).unwrap()
}

#[tokio::test(start_paused = true)]
async fn remote_is_always_called_first() {
    let cache = CacheService::in_memory(64);
    let stub = Stub::ok(stock(8));
    let client = inventory_client(&pipeline(), cache.clone(), &stub, None);
    let ctx = RequestContext::new();

    assert_eq!(client.get(Sku(1), &ctx).await.value, stock(8));
    stub.respond(Ok(stock(7)));
    let answer = client.get(Sku(1), &ctx).await;

    assert_eq!(answer.value, stock(7));
    assert_eq!(answer.quality, AnswerQuality::Fresh);
    assert_eq!(stub.calls(), 2);
    assert_eq!(
        cache.get(CacheKey::for_sku("inventory", 1).as_str()).await,
        Some(stock(7))
    );
}

#[tokio::test(start_paused = true)]
async fn failure_serves_cached_value_and_logs_it() {
    let (logs, _guard) = capture_logs();
    let stub = Stub::ok(stock(5));
    let client = inventory_client(&pipeline(), CacheService::in_memory(64), &stub, None);
    let ctx = RequestContext::new().with_order_number("ord-9");

    client.get(Sku(12), &ctx).await;
    stub.respond(Err(ResilienceError::server(500, "db down")));
    let answer = client.get(Sku(12), &ctx).await;

    assert_eq!(answer.value, stock(5));
    assert_eq!(answer.quality, AnswerQuality::Stale);
    let lines = logs.lines_with("used cached fallback");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("circuit_state=CLOSED"), "{}", lines[0]);
    assert!(lines[0].contains("sku=12"), "{}", lines[0]);
    assert!(lines[0].contains("order_number=\"ord-9\""), "{}", lines[0]);
}

#[tokio::test(start_paused = true)]
async fn expired_entry_within_staleness_bound_is_served() {
    let stub = Stub::ok(stock(3));
    let client = inventory_client(
        &pipeline(),
        CacheService::in_memory(64),
        &stub,
        Some(Duration::from_secs(300)),
    );
    let ctx = RequestContext::new();

    client.get(Sku(2), &ctx).await;
    tokio::time::advance(Duration::from_secs(120)).await;
    stub.respond(Err(ResilienceError::connection("refused")));

    let answer = client.get(Sku(2), &ctx).await;
    assert_eq!(answer.quality, AnswerQuality::Stale);
    assert_eq!(answer.value, stock(3));

    tokio::time::advance(Duration::from_secs(300)).await;
    let answer = client.get(Sku(2), &ctx).await;
    assert_eq!(answer.quality, AnswerQuality::Sentinel);
    assert_eq!(answer.value.available_quantity, BACKORDERED);
}

#[tokio::test(start_paused = true)]
async fn no_cached_value_means_backordered() {
    let (logs, _guard) = capture_logs();
    let stub = Stub::<InventoryResponse>::failing(ResilienceError::connection("refused"));
    let client = inventory_client(&pipeline(), CacheService::in_memory(64), &stub, None);

    let answer = client.get(Sku(404), &RequestContext::new()).await;

    assert_eq!(answer.value, stock(-1));
    assert_eq!(answer.quality, AnswerQuality::Sentinel);
    assert_eq!(logs.lines_with("no cached value available").len(), 1);
    assert!(logs.lines_with("used cached fallback").is_empty());
}

#[tokio::test(start_paused = true)]
async fn open_circuit_still_serves_cached_value() {
    let (logs, _guard) = capture_logs();
    let pipeline = pipeline();
    let stub = Stub::ok(stock(11));
    let client = inventory_client(&pipeline, CacheService::in_memory(64), &stub, None);
    let ctx = RequestContext::new();

    client.get(Sku(6), &ctx).await;
    pipeline.policy("inventory").unwrap().force_open();

    let answer = client.get(Sku(6), &ctx).await;
    assert_eq!(answer.value, stock(11));
    assert_eq!(answer.quality, AnswerQuality::Stale);
    assert_eq!(stub.calls(), 1);
    assert_eq!(client.policy().circuit_state(), CircuitState::Open);

    let failed = logs.lines_with("downstream call failed");
    assert!(failed[0].contains("error_kind=\"circuit_open\""), "{}", failed[0]);
    assert!(
        logs.lines_with("used cached fallback")[0].contains("circuit_state=OPEN"),
        "{}",
        logs.contents()
    );
}
