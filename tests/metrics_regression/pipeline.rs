//! Pipeline layer metrics

use super::helpers::*;
use serial_test::serial;
use std::time::Duration;
use storefront_resilience::{PolicyConfig, ResilienceError, ResiliencePipeline};

#[tokio::test]
#[serial]
async fn layer_metrics_carry_the_policy_label() {
    init_recorder();

    let pipeline = ResiliencePipeline::from_configs([(
        "metrics_price",
        PolicyConfig {
            timeout: Duration::from_millis(50),
            max_attempts: 2,
            retry_delay: Duration::from_millis(1),
            sliding_window_size: 2,
            minimum_number_of_calls: 2,
            ..PolicyConfig::default()
        },
    )])
    .unwrap();

    let ok = pipeline
        .decorate("metrics_price", || async { Ok::<_, ResilienceError>(1) })
        .unwrap();
    ok.call().await.unwrap();

    let slow = pipeline
        .decorate("metrics_price", || async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, ResilienceError>(2)
        })
        .unwrap();
    let _ = slow.call().await;
    let _ = ok.call().await;

    assert_counter_exists("bulkhead_calls_permitted_total");
    assert_metric_has_label("bulkhead_calls_permitted_total", "policy", "metrics_price");
    assert_gauge_exists("bulkhead_concurrent_calls");

    assert_counter_exists("retry_calls_total");
    assert_metric_has_label("retry_calls_total", "outcome", "success");
    assert_counter_exists("retry_attempts_total");

    assert_counter_exists("circuitbreaker_calls_total");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "failure");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "rejected");
    assert_counter_exists("circuitbreaker_transitions_total");
    assert_gauge_exists("circuitbreaker_state");

    assert_counter_exists("timelimiter_calls_total");
    assert_metric_has_label("timelimiter_calls_total", "result", "timeout");
    assert_histogram_exists("timelimiter_call_duration_seconds");
}

#[tokio::test]
#[serial]
async fn limiter_rejections_are_counted() {
    init_recorder();

    let pipeline = ResiliencePipeline::from_configs([(
        "metrics_inventory",
        PolicyConfig {
            max_concurrent_calls: 1,
            ..PolicyConfig::default()
        },
    )])
    .unwrap();
    let slow = pipeline
        .decorate("metrics_inventory", || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, ResilienceError>(())
        })
        .unwrap();

    let _ = tokio::join!(slow.call(), slow.call());

    assert_counter_exists("bulkhead_calls_rejected_total");
    assert_metric_has_label(
        "bulkhead_calls_rejected_total",
        "policy",
        "metrics_inventory",
    );
}
