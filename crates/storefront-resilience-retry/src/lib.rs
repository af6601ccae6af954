//! Bounded retry for storefront downstream calls.
//!
//! [`Retry`] re-issues a failed call up to `max_attempts` times in total, sleeping
//! according to an [`IntervalFunction`] between attempts. Only errors accepted by the
//! configured predicate are retried; anything else, and the last retryable error once
//! attempts run out, is returned unchanged.
//!
//! For [`ResilienceError`](storefront_resilience_core::ResilienceError) the predicate is
//! normally `ResilienceError::is_transient`, which excludes rejections such as an open
//! circuit so that a tripped breaker ends the retry loop immediately.
//!
//! ```rust
//! use storefront_resilience_core::ResilienceError;
//! use storefront_resilience_retry::RetryLayer;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tower::{Layer, ServiceExt, service_fn};
//!
//! # async fn example() {
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&calls);
//! let flaky = service_fn(move |_: ()| {
//!     let n = counter.fetch_add(1, Ordering::SeqCst);
//!     async move {
//!         if n == 0 {
//!             Err(ResilienceError::connection("reset by peer"))
//!         } else {
//!             Ok("ok")
//!         }
//!     }
//! });
//!
//! let retry = RetryLayer::<ResilienceError>::builder()
//!     .max_attempts(3)
//!     .fixed_backoff(Duration::from_millis(10))
//!     .retry_on(ResilienceError::is_transient)
//!     .build();
//!
//! assert_eq!(retry.layer(flaky).oneshot(()).await, Ok("ok"));
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! # }
//! ```

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};

#[cfg(feature = "metrics")]
use metrics::counter;

mod backoff;
mod config;
mod events;
mod layer;

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use layer::RetryLayer;

/// A Tower service that retries failed calls.
pub struct Retry<S, E> {
    inner: S,
    config: Arc<RetryConfig<E>>,
}

impl<S, E> Retry<S, E> {
    pub(crate) fn new(inner: S, config: Arc<RetryConfig<E>>) -> Self {
        Self { inner, config }
    }
}

impl<S: Clone, E> Clone for Retry<S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, E> Service<Req> for Retry<S, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Future: Send + 'static,
    E: Send + 'static,
    Req: Clone + Send + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<S::Response, E>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let clone = self.inner.clone();
        let mut service = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let mut attempt = 1;

            loop {
                // The first attempt uses the service readied by the caller.
                let result = if attempt == 1 {
                    service.call(req.clone()).await
                } else {
                    match service.ready().await {
                        Ok(ready) => ready.call(req.clone()).await,
                        Err(err) => Err(err),
                    }
                };

                let error = match result {
                    Ok(response) => {
                        config.event_listeners.emit(&RetryEvent::Success {
                            policy: config.name.clone(),
                            attempts: attempt,
                        });

                        #[cfg(feature = "metrics")]
                        counter!("retry_calls_total", "policy" => config.name.to_string(), "outcome" => if attempt == 1 { "success" } else { "success_after_retry" }).increment(1);

                        return Ok(response);
                    }
                    Err(error) => error,
                };

                if !config.should_retry(&error) {
                    config.event_listeners.emit(&RetryEvent::IgnoredError {
                        policy: config.name.clone(),
                        attempts: attempt,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "policy" => config.name.to_string(), "outcome" => "not_retried").increment(1);

                    return Err(error);
                }

                if attempt >= config.max_attempts {
                    config.event_listeners.emit(&RetryEvent::Exhausted {
                        policy: config.name.clone(),
                        attempts: attempt,
                    });

                    #[cfg(feature = "tracing")]
                    tracing::warn!(policy = %config.name, attempts = attempt, "retries exhausted");

                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "policy" => config.name.to_string(), "outcome" => "exhausted").increment(1);

                    return Err(error);
                }

                let delay = config.interval_fn.next_interval(attempt - 1);
                config.event_listeners.emit(&RetryEvent::Retry {
                    policy: config.name.clone(),
                    attempt,
                    delay,
                });

                #[cfg(feature = "tracing")]
                tracing::debug!(policy = %config.name, attempt, ?delay, "retrying after failed attempt");

                #[cfg(feature = "metrics")]
                counter!("retry_attempts_total", "policy" => config.name.to_string()).increment(1);

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        })
    }
}
