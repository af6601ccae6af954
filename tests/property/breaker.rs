//! Property tests for the circuit breaker.
//!
//! Invariants tested:
//! - The circuit opens exactly when the window's failure rate reaches the threshold,
//!   once the minimum number of calls is recorded
//! - While open, the operation is never invoked

use super::paused_runtime;
use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storefront_resilience::{CircuitState, PolicyConfig, ResilienceError, ResiliencePipeline};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn breaker_matches_window_model(
        outcomes in prop::collection::vec(any::<bool>(), 1..60),
        window in 1usize..10,
        minimum in 1usize..10,
        threshold in 0.1f64..=1.0,
    ) {
        let minimum = minimum.min(window);
        let config = PolicyConfig {
            max_attempts: 1,
            sliding_window_size: window,
            minimum_number_of_calls: minimum,
            failure_rate_threshold: threshold,
            wait_duration_in_open: Duration::from_secs(3600),
            ..PolicyConfig::default()
        };
        let pipeline = ResiliencePipeline::from_configs([("inventory", config)]).unwrap();

        paused_runtime().block_on(async {
            let invoked = Arc::new(AtomicUsize::new(0));
            let mut model: VecDeque<bool> = VecDeque::new();
            let mut model_open = false;

            for fail in outcomes {
                let counter = Arc::clone(&invoked);
                let op = pipeline
                    .decorate("inventory", move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        async move {
                            if fail {
                                Err(ResilienceError::server(500, "boom"))
                            } else {
                                Ok(())
                            }
                        }
                    })
                    .unwrap();

                let before = invoked.load(Ordering::SeqCst);
                let result = op.call().await;

                if model_open {
                    prop_assert!(result.unwrap_err().is_circuit_open());
                    prop_assert_eq!(invoked.load(Ordering::SeqCst), before);
                    continue;
                }

                prop_assert_eq!(invoked.load(Ordering::SeqCst), before + 1);
                model.push_back(fail);
                while model.len() > window {
                    model.pop_front();
                }
                let failures = model.iter().filter(|f| **f).count();
                if model.len() >= minimum && failures as f64 / model.len() as f64 >= threshold {
                    model_open = true;
                }

                let expected = if model_open { CircuitState::Open } else { CircuitState::Closed };
                prop_assert_eq!(pipeline.circuit_state("inventory"), Some(expected));
            }
            Ok(())
        })?;
    }
}
