use crate::common::{capture_logs, quick_policy, Stub};
use std::time::Duration;
use storefront_aggregator::{
    AnswerQuality, MerchandiseClient, MerchandiseRequest, MerchandiseResponse, PriceClient,
    PriceRequest, PriceResponse, RequestContext, ResilientCachedClient, Sku,
};
use storefront_cache::{CacheKey, CacheService};
use storefront_resilience::{PipelineError, ResilienceError, ResiliencePipeline};

fn pipeline() -> ResiliencePipeline {
    ResiliencePipeline::from_configs([("merchandise", quick_policy()), ("price", quick_policy())])
        .unwrap()
}

fn widget() -> MerchandiseResponse {
    MerchandiseResponse {
        name: "Widget".to_string(),
        description: "A very useful widget".to_string(),
        image_url: "https://cdn.example.com/widget.png".to_string(),
        category: "Tools".to_string(),
    }
}

fn merchandise_client(
    pipeline: &ResiliencePipeline,
    cache: CacheService,
    stub: &Stub<MerchandiseResponse>,
) -> MerchandiseClient {
    ResilientCachedClient::builder("merchandise", MerchandiseResponse::fallback())
        .ttl(Duration::from_secs(15 * 60))
        .build(pipeline, cache, |sku| MerchandiseRequest { sku }, stub.clone())
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn hit_within_ttl_skips_remote_and_expiry_refetches() {
    let stub = Stub::ok(widget());
    let client = merchandise_client(&pipeline(), CacheService::in_memory(64), &stub);
    let ctx = RequestContext::new();

    assert_eq!(client.get(Sku(1), &ctx).await.quality, AnswerQuality::Fresh);
    tokio::time::advance(Duration::from_secs(14 * 60)).await;
    let cached = client.get(Sku(1), &ctx).await;
    assert_eq!(cached.quality, AnswerQuality::Cached);
    assert_eq!(cached.value, widget());
    assert_eq!(stub.calls(), 1);

    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(client.get(Sku(1), &ctx).await.quality, AnswerQuality::Fresh);
    assert_eq!(stub.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn success_is_written_before_returning() {
    let cache = CacheService::in_memory(64);
    let stub = Stub::ok(PriceResponse {
        price: "19.99".to_string(),
        original_price: "24.99".to_string(),
        currency: "USD".to_string(),
    });
    let client: PriceClient = ResilientCachedClient::builder("price", PriceResponse::fallback())
        .ttl(Duration::from_secs(120))
        .build(&pipeline(), cache.clone(), |sku| PriceRequest { sku }, stub.clone())
        .unwrap();

    let answer = client.get(Sku(55), &RequestContext::new()).await;
    let cached: Option<PriceResponse> = cache.get(CacheKey::for_sku("price", 55).as_str()).await;
    assert_eq!(cached, Some(answer.value));
}

#[tokio::test(start_paused = true)]
async fn failure_returns_fallback_without_serving_stale_entries() {
    let cache = CacheService::in_memory(64);
    let stub = Stub::ok(widget());
    let client = merchandise_client(&pipeline(), cache, &stub);
    let ctx = RequestContext::new();

    client.get(Sku(2), &ctx).await;
    tokio::time::advance(Duration::from_secs(16 * 60)).await;
    stub.respond(Err(ResilienceError::server(503, "maintenance")));

    let answer = client.get(Sku(2), &ctx).await;
    assert_eq!(answer.quality, AnswerQuality::Sentinel);
    assert_eq!(answer.value, MerchandiseResponse::fallback());
    assert_eq!(answer.value.name, "Unknown Product");
}

#[tokio::test(start_paused = true)]
async fn failure_is_logged_with_policy_kind_and_circuit_state() {
    let (logs, _guard) = capture_logs();
    let stub = Stub::<MerchandiseResponse>::failing(ResilienceError::connection("refused"));
    let client = merchandise_client(&pipeline(), CacheService::in_memory(64), &stub);
    let ctx = RequestContext::new()
        .with_store_number(1234)
        .with_session_id("s-42");

    client.get(Sku(3), &ctx).await;

    let lines = logs.lines_with("downstream call failed");
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line.contains("policy=merchandise"), "{line}");
    assert!(line.contains("error_kind=\"connection_failure\""), "{line}");
    assert!(line.contains("circuit_state=CLOSED"), "{line}");
    assert!(line.contains("store_number=1234"), "{line}");
    assert!(line.contains("session_id=\"s-42\""), "{line}");
    assert_eq!(stub.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn open_circuit_answers_with_fallback_without_calling_remote() {
    let pipeline = pipeline();
    let stub = Stub::ok(widget());
    let client = merchandise_client(&pipeline, CacheService::in_memory(64), &stub);
    pipeline.policy("merchandise").unwrap().force_open();

    let answer = client.get(Sku(4), &RequestContext::new()).await;
    assert_eq!(answer.quality, AnswerQuality::Sentinel);
    assert_eq!(stub.calls(), 0);
}

#[test]
fn unknown_policy_is_a_construction_error() {
    let err = ResilientCachedClient::builder("merch", MerchandiseResponse::fallback())
        .build(
            &pipeline(),
            CacheService::in_memory(8),
            |sku| MerchandiseRequest { sku },
            Stub::ok(widget()),
        )
        .unwrap_err();
    assert_eq!(err, PipelineError::UnknownPolicy("merch".into()));
}
