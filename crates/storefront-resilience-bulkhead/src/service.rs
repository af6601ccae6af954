//! Concurrency limiter service implementation.

use crate::config::BulkheadConfig;
use crate::error::BulkheadError;
use crate::events::BulkheadEvent;
use crate::layer::Shared;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, TryAcquireError};
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Service that holds a permit from its policy's pool for the whole call.
pub struct Bulkhead<S> {
    inner: S,
    shared: Arc<Shared>,
}

impl<S> Bulkhead<S> {
    pub(crate) fn new(inner: S, shared: Arc<Shared>) -> Self {
        Self { inner, shared }
    }
}

impl<S: Clone> Clone for Bulkhead<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

async fn acquire(shared: &Shared) -> Result<OwnedSemaphorePermit, BulkheadError> {
    let config = &shared.config;
    let semaphore = Arc::clone(&shared.semaphore);

    if config.max_wait_duration.is_zero() {
        return match semaphore.try_acquire_owned() {
            Ok(permit) => Ok(permit),
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => {
                Err(BulkheadError::Full {
                    policy: config.name.clone(),
                    max_concurrent: config.max_concurrent_calls,
                })
            }
        };
    }

    match tokio::time::timeout(config.max_wait_duration, semaphore.acquire_owned()).await {
        Ok(Ok(permit)) => Ok(permit),
        // The semaphore is never closed; treat it like a full pool.
        Ok(Err(_)) => Err(BulkheadError::Full {
            policy: config.name.clone(),
            max_concurrent: config.max_concurrent_calls,
        }),
        Err(_) => Err(BulkheadError::WaitTimeout {
            policy: config.name.clone(),
            max_concurrent: config.max_concurrent_calls,
            waited: config.max_wait_duration,
        }),
    }
}

fn rejected(config: &BulkheadConfig, err: &BulkheadError) {
    config.event_listeners.emit(&BulkheadEvent::CallRejected {
        policy: config.name.clone(),
        max_concurrent_calls: config.max_concurrent_calls,
    });

    #[cfg(feature = "tracing")]
    tracing::warn!(policy = %config.name, error = %err, "concurrency limit reached");
    #[cfg(not(feature = "tracing"))]
    let _ = err;

    #[cfg(feature = "metrics")]
    counter!("bulkhead_calls_rejected_total", "policy" => config.name.to_string()).increment(1);
}

impl<S, Request> Service<Request> for Bulkhead<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<BulkheadError> + Send + 'static,
    Request: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let shared = Arc::clone(&self.shared);
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let config = &shared.config;
            let permit = match acquire(&shared).await {
                Ok(permit) => permit,
                Err(err) => {
                    rejected(config, &err);
                    return Err(err.into());
                }
            };

            let concurrent_calls =
                config.max_concurrent_calls - shared.semaphore.available_permits();
            config.event_listeners.emit(&BulkheadEvent::CallPermitted {
                policy: config.name.clone(),
                concurrent_calls,
            });

            #[cfg(feature = "metrics")]
            {
                counter!("bulkhead_calls_permitted_total", "policy" => config.name.to_string())
                    .increment(1);
                gauge!("bulkhead_concurrent_calls", "policy" => config.name.to_string())
                    .set(concurrent_calls as f64);
            }

            let start = Instant::now();
            let result = inner.call(request).await;
            drop(permit);
            let duration = start.elapsed();

            let event = match &result {
                Ok(_) => BulkheadEvent::CallFinished {
                    policy: config.name.clone(),
                    duration,
                },
                Err(_) => BulkheadEvent::CallFailed {
                    policy: config.name.clone(),
                    duration,
                },
            };
            config.event_listeners.emit(&event);

            #[cfg(feature = "metrics")]
            gauge!("bulkhead_concurrent_calls", "policy" => config.name.to_string()).set(
                (config.max_concurrent_calls - shared.semaphore.available_permits()) as f64,
            );

            result
        })
    }
}
