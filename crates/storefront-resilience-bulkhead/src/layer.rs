//! Tower layer implementation for the concurrency limiter.

use crate::config::{BulkheadConfig, BulkheadConfigBuilder};
use crate::service::Bulkhead;
use std::sync::Arc;
use storefront_resilience_core::PolicyName;
use tokio::sync::Semaphore;
use tower::Layer;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

pub(crate) struct Shared {
    pub(crate) config: BulkheadConfig,
    pub(crate) semaphore: Arc<Semaphore>,
}

/// Layer that bounds the number of in-flight calls for one policy.
///
/// The permits live in the layer, so every service it wraps draws from the same pool.
#[derive(Clone)]
pub struct BulkheadLayer {
    shared: Arc<Shared>,
}

impl BulkheadLayer {
    pub(crate) fn new(config: BulkheadConfig) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "bulkhead_calls_permitted_total",
                "Total number of calls that acquired a permit"
            );
            describe_counter!(
                "bulkhead_calls_rejected_total",
                "Total number of calls rejected by the limiter"
            );
            describe_gauge!(
                "bulkhead_concurrent_calls",
                "Number of calls currently holding a permit"
            );
        });

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_calls));
        Self {
            shared: Arc::new(Shared { config, semaphore }),
        }
    }

    /// Creates a new builder for configuring a limiter.
    ///
    /// ```
    /// use storefront_resilience_bulkhead::BulkheadLayer;
    /// use std::time::Duration;
    ///
    /// let layer = BulkheadLayer::builder()
    ///     .name("price")
    ///     .max_concurrent_calls(10)
    ///     .max_wait_duration(Duration::from_millis(50))
    ///     .build();
    /// assert_eq!(layer.available_permits(), 10);
    /// ```
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::new()
    }

    /// The policy this limiter belongs to.
    pub fn name(&self) -> &PolicyName {
        &self.shared.config.name
    }

    /// Permits not currently held.
    pub fn available_permits(&self) -> usize {
        self.shared.semaphore.available_permits()
    }

    /// Calls currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.shared.config.max_concurrent_calls - self.available_permits()
    }
}

impl<S> Layer<S> for BulkheadLayer {
    type Service = Bulkhead<S>;

    fn layer(&self, service: S) -> Self::Service {
        Bulkhead::new(service, Arc::clone(&self.shared))
    }
}

impl std::fmt::Debug for BulkheadLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkheadLayer")
            .field("policy", &self.shared.config.name)
            .field("max_concurrent_calls", &self.shared.config.max_concurrent_calls)
            .field("available_permits", &self.available_permits())
            .finish()
    }
}
