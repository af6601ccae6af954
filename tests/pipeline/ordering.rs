use super::{pipeline, policy, Calls};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storefront_resilience::{CircuitState, PolicyConfig, ResilienceError, ResiliencePipeline};

#[tokio::test(start_paused = true)]
async fn open_circuit_ends_the_retry_loop() {
    let pipeline = pipeline(
        "inventory",
        PolicyConfig {
            max_attempts: 5,
            sliding_window_size: 2,
            minimum_number_of_calls: 2,
            ..policy()
        },
    );
    let calls = Calls::default();
    let counter = calls.clone();
    let op = pipeline
        .decorate("inventory", move || {
            counter.hit();
            async { Err::<(), _>(ResilienceError::server(503, "unavailable")) }
        })
        .unwrap();

    let err = op.call().await.unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(calls.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn each_timed_out_attempt_is_a_breaker_failure() {
    let pipeline = pipeline(
        "inventory",
        PolicyConfig {
            max_attempts: 3,
            sliding_window_size: 10,
            minimum_number_of_calls: 10,
            ..policy()
        },
    );
    let op = pipeline
        .decorate("inventory", || async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, ResilienceError>(5_i64)
        })
        .unwrap();

    assert!(op.call().await.unwrap_err().is_timeout());
    let metrics = pipeline.policy("inventory").unwrap().circuit_metrics();
    assert_eq!(metrics.total_calls, 3);
    assert_eq!(metrics.failure_count, 3);
}

#[tokio::test(start_paused = true)]
async fn permit_is_held_across_retries() {
    let pipeline = pipeline(
        "price",
        PolicyConfig {
            max_attempts: 3,
            retry_delay: Duration::from_millis(200),
            max_concurrent_calls: 1,
            sliding_window_size: 20,
            minimum_number_of_calls: 20,
            ..policy()
        },
    );
    let calls = Calls::default();
    let counter = calls.clone();
    let op = pipeline
        .decorate("price", move || {
            let attempt = counter.hit();
            async move {
                if attempt == 1 {
                    Err(ResilienceError::connection("refused"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .unwrap();

    let (first, second) = tokio::join!(op.call(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        op.call().await
    });
    assert_eq!(first, Ok(2));
    assert!(matches!(
        second,
        Err(ResilienceError::ResourceExhausted { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn hooks_observe_retries_and_transitions() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let (retries, transitions) = (events.clone(), events.clone());
    let pipeline = ResiliencePipeline::builder()
        .policy(
            "merchandise",
            PolicyConfig {
                max_attempts: 3,
                ..policy()
            },
        )
        .on_retry(move |policy, attempt| {
            retries.lock().unwrap().push(format!("{policy} retry after attempt {attempt}"));
        })
        .on_state_transition(move |policy, from, to| {
            transitions.lock().unwrap().push(format!("{policy} {from} -> {to}"));
        })
        .build()
        .unwrap();

    let op = pipeline
        .decorate("merchandise", || async {
            Err::<(), _>(ResilienceError::connection("refused"))
        })
        .unwrap();
    let _ = op.call().await;
    let _ = op.call().await;

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "merchandise retry after attempt 1",
            "merchandise retry after attempt 2",
            "merchandise CLOSED -> OPEN",
            "merchandise retry after attempt 1",
        ]
    );
    assert_eq!(
        pipeline.circuit_state("merchandise"),
        Some(CircuitState::Open)
    );
}
