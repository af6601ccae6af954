use crate::{Retry, RetryConfig, RetryConfigBuilder};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that re-issues failed calls.
///
/// ```
/// use storefront_resilience_core::ResilienceError;
/// use storefront_resilience_retry::RetryLayer;
/// use tower::{ServiceBuilder, service_fn};
/// use std::time::Duration;
///
/// let retry = RetryLayer::<ResilienceError>::builder()
///     .name("inventory")
///     .max_attempts(3)
///     .fixed_backoff(Duration::from_millis(200))
///     .retry_on(ResilienceError::is_transient)
///     .build();
///
/// let _service = ServiceBuilder::new()
///     .layer(retry)
///     .service(service_fn(|sku: u64| async move { Ok::<_, ResilienceError>(sku) }));
/// ```
pub struct RetryLayer<E> {
    config: Arc<RetryConfig<E>>,
}

impl<E> RetryLayer<E> {
    pub(crate) fn new(config: RetryConfig<E>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a retry layer.
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    /// The configuration shared by every service this layer produces.
    pub fn config(&self) -> &RetryConfig<E> {
        &self.config
    }
}

impl<E> Clone for RetryLayer<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, E> Layer<S> for RetryLayer<E> {
    type Service = Retry<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, Arc::clone(&self.config))
    }
}
