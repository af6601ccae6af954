//! Per-policy circuit breaker for storefront downstream calls.
//!
//! A breaker watches the outcomes of the calls made under one policy and stops
//! forwarding calls while the recent failure rate is too high.
//!
//! ## States
//! - **Closed**: calls pass through and every outcome enters the sliding window
//! - **Open**: calls are rejected with [`CircuitOpenError`] without reaching the operation
//! - **Half-Open**: after the cool-down, a limited number of trial calls test the downstream
//!
//! Every error returned by the wrapped service counts as a failure. Rejections produced
//! by this breaker are not recorded.
//!
//! ## Usage
//!
//! ```rust
//! use storefront_resilience_circuitbreaker::CircuitBreakerLayer;
//! use storefront_resilience_core::ResilienceError;
//! use std::time::Duration;
//! use tower::{ServiceBuilder, ServiceExt, service_fn};
//!
//! # async fn example() {
//! let breaker = CircuitBreakerLayer::builder()
//!     .name("inventory")
//!     .failure_rate_threshold(0.5)
//!     .sliding_window_size(10)
//!     .wait_duration_in_open(Duration::from_secs(10))
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(breaker.clone())
//!     .service(service_fn(|sku: u64| async move {
//!         Ok::<_, ResilienceError>(sku * 2)
//!     }));
//!
//! let doubled = service.oneshot(21).await;
//! assert_eq!(doubled, Ok(42));
//! # }
//! ```
//!
//! The layer is the unit of sharing: services produced by the same layer feed one window,
//! and [`CircuitBreakerLayer::state`] reports the state all of them observe.
//!
//! ## Feature Flags
//! - `metrics`: transition and call counters, state gauge
//! - `tracing`: state transitions and rejections are logged
//! - `serde`: serialization of [`CircuitState`] and [`CircuitMetrics`]

use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::counter;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::Instant;
use tower::Service;

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitOpenError;
pub use events::CircuitBreakerEvent;
pub use layer::CircuitBreakerLayer;

mod circuit;
mod config;
mod error;
mod events;
mod layer;

use circuit::Admission;
use layer::Shared;

/// A Tower service gated by a circuit breaker.
///
/// Created by [`CircuitBreakerLayer`]; all clones share the layer's circuit.
pub struct CircuitBreaker<S> {
    inner: S,
    shared: Arc<Shared>,
}

impl<S> CircuitBreaker<S> {
    pub(crate) fn new(inner: S, shared: Arc<Shared>) -> Self {
        Self { inner, shared }
    }

    /// Current state of the shared circuit.
    pub fn state(&self) -> CircuitState {
        self.shared.lock().state()
    }
}

impl<S: Clone> Clone for CircuitBreaker<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Holds an admission until its outcome is recorded; releases it if the call is dropped.
struct InFlight {
    shared: Arc<Shared>,
    admission: Option<Admission>,
    started: Instant,
}

impl InFlight {
    fn complete(mut self, failed: bool) {
        let Some(admission) = self.admission.take() else {
            return;
        };
        let duration = self.started.elapsed();
        self.shared.update(|circuit, config| {
            if failed {
                circuit.record_failure(admission, config, duration);
            } else {
                circuit.record_success(admission, config, duration);
            }
        });
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(admission) = self.admission.take() {
            self.shared.lock().abandon(admission);
        }
    }
}

impl<S, Req> Service<Req> for CircuitBreaker<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<CircuitOpenError> + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let shared = Arc::clone(&self.shared);
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let admission = shared.update(|circuit, config| circuit.try_acquire(config));

            let Some(admission) = admission else {
                #[cfg(feature = "tracing")]
                tracing::debug!(policy = %shared.config.name, "circuit open, call rejected");

                #[cfg(feature = "metrics")]
                counter!("circuitbreaker_calls_total", "policy" => shared.config.name.to_string(), "outcome" => "rejected").increment(1);

                return Err(CircuitOpenError {
                    policy: shared.config.name.clone(),
                }
                .into());
            };

            let in_flight = InFlight {
                shared: Arc::clone(&shared),
                admission: Some(admission),
                started: Instant::now(),
            };

            let result = inner.call(req).await;
            in_flight.complete(result.is_err());
            result
        })
    }
}
