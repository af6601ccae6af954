//! Property tests for retry.
//!
//! Invariants tested:
//! - The operation runs at most `max_attempts` times per call
//! - A call succeeds iff a success arrives within the attempt budget

use super::paused_runtime;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storefront_resilience::{PolicyConfig, ResilienceError, ResiliencePipeline};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn attempts_are_bounded(max_attempts in 1usize..6, failures_before_success in 0usize..8) {
        let config = PolicyConfig {
            max_attempts,
            retry_delay: Duration::from_millis(5),
            sliding_window_size: 100,
            minimum_number_of_calls: 100,
            ..PolicyConfig::default()
        };
        let pipeline = ResiliencePipeline::from_configs([("merchandise", config)]).unwrap();

        paused_runtime().block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);
            let op = pipeline
                .decorate("merchandise", move || {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < failures_before_success {
                            Err(ResilienceError::connection("refused"))
                        } else {
                            Ok(attempt)
                        }
                    }
                })
                .unwrap();

            let result = op.call().await;

            prop_assert_eq!(
                calls.load(Ordering::SeqCst),
                (failures_before_success + 1).min(max_attempts)
            );
            prop_assert_eq!(result.is_ok(), failures_before_success < max_attempts);
            Ok(())
        })?;
    }
}
