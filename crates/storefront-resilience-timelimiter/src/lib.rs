//! Per-attempt timeout for storefront downstream calls.
//!
//! [`TimeLimiter`] races the wrapped call against the policy's timeout. When the timeout
//! wins, the call's future is dropped and the caller gets a [`TimeoutError`], which
//! converts into `ResilienceError::Timeout`. Placed innermost in a pipeline, it bounds
//! each attempt separately, so a retry loop gets a fresh budget per attempt.
//!
//! ```rust
//! use storefront_resilience_core::ResilienceError;
//! use storefront_resilience_timelimiter::TimeLimiterLayer;
//! use std::time::Duration;
//! use tower::{Layer, ServiceExt, service_fn};
//!
//! # async fn example() {
//! let layer = TimeLimiterLayer::builder()
//!     .name("price")
//!     .timeout_duration(Duration::from_millis(50))
//!     .build();
//!
//! let slow = layer.layer(service_fn(|_: ()| async {
//!     tokio::time::sleep(Duration::from_secs(1)).await;
//!     Ok::<_, ResilienceError>(())
//! }));
//!
//! assert!(slow.oneshot(()).await.unwrap_err().is_timeout());
//! # }
//! ```

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
#[cfg(feature = "metrics")]
use std::time::Instant;
use tokio::time::timeout;
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

mod config;
mod error;
mod events;
mod layer;

use config::TimeLimiterConfig;
pub use config::TimeLimiterConfigBuilder;
pub use error::TimeoutError;
pub use events::TimeLimiterEvent;
pub use layer::TimeLimiterLayer;

/// A Tower service applying a timeout to each call.
pub struct TimeLimiter<S> {
    inner: S,
    config: Arc<TimeLimiterConfig>,
}

impl<S> TimeLimiter<S> {
    pub(crate) fn new(inner: S, config: Arc<TimeLimiterConfig>) -> Self {
        Self { inner, config }
    }
}

impl<S: Clone> Clone for TimeLimiter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req> Service<Req> for TimeLimiter<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<TimeoutError> + Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);
        let timeout_duration = config.timeout_duration;

        Box::pin(async move {
            #[cfg(feature = "metrics")]
            let start = Instant::now();

            match timeout(timeout_duration, inner.call(req)).await {
                Ok(result) => {
                    #[cfg(feature = "metrics")]
                    {
                        let outcome = if result.is_ok() { "success" } else { "error" };
                        counter!("timelimiter_calls_total", "policy" => config.name.to_string(), "result" => outcome).increment(1);
                        histogram!("timelimiter_call_duration_seconds", "policy" => config.name.to_string())
                            .record(start.elapsed().as_secs_f64());
                    }

                    result
                }
                Err(_elapsed) => {
                    config.event_listeners.emit(&TimeLimiterEvent::Timeout {
                        policy: config.name.clone(),
                        timeout_duration,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("timelimiter_calls_total", "policy" => config.name.to_string(), "result" => "timeout").increment(1);

                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        policy = %config.name,
                        timeout_ms = timeout_duration.as_millis() as u64,
                        "call timed out"
                    );

                    Err(TimeoutError {
                        policy: config.name.clone(),
                        after: timeout_duration,
                    }
                    .into())
                }
            }
        })
    }
}
