use super::harness;
use crate::common::capture_logs;
use std::time::Duration;
use storefront_aggregator::{AnswerQuality, RequestContext, Sku};
use storefront_resilience::ResilienceError;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn branches_run_concurrently() {
    let h = harness();
    h.merchandise.hang_for(Duration::from_millis(150));
    h.price.hang_for(Duration::from_millis(150));
    h.inventory.hang_for(Duration::from_millis(150));

    let started = Instant::now();
    let product = h.aggregator.get_composite(Sku(1), &RequestContext::new()).await;

    assert!(started.elapsed() < Duration::from_millis(300));
    assert!(!product.quality.is_degraded());
}

#[tokio::test(start_paused = true)]
async fn every_branch_failing_still_produces_a_product() {
    let h = harness();
    h.merchandise.respond(Err(ResilienceError::malformed("truncated body")));
    h.price.respond(Err(ResilienceError::client(404, "unknown sku")));
    h.inventory.respond(Err(ResilienceError::connection("refused")));

    let product = h.aggregator.get_composite(Sku(2), &RequestContext::new()).await;

    assert_eq!(product.name, "Unknown Product");
    assert_eq!(product.description, "Description unavailable");
    assert_eq!(product.category, "Unknown");
    assert_eq!(product.price, "0.00");
    assert_eq!(product.available_quantity, -1);
    assert_eq!(product.quality.merchandise, AnswerQuality::Sentinel);
    assert_eq!(product.quality.price, AnswerQuality::Sentinel);
    assert_eq!(product.quality.inventory, AnswerQuality::Sentinel);
}

#[tokio::test(start_paused = true)]
async fn healthy_composite_logs_one_summary_line() {
    let (logs, _guard) = capture_logs();
    let h = harness();

    h.aggregator
        .get_composite(Sku(3), &RequestContext::new().with_user_id("u-7"))
        .await;

    let summary = logs.lines_with("assembled product");
    assert_eq!(summary.len(), 1);
    assert!(summary[0].contains("user_id=\"u-7\""), "{}", summary[0]);
    assert!(summary[0].contains("inventory=fresh"), "{}", summary[0]);
    assert!(logs.lines_with("downstream call failed").is_empty());
}
