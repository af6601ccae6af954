use crate::config::TimeLimiterConfig;
use crate::{TimeLimiter, TimeLimiterConfigBuilder};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] bounding each call by a timeout.
#[derive(Clone)]
pub struct TimeLimiterLayer {
    config: Arc<TimeLimiterConfig>,
}

impl TimeLimiterLayer {
    pub(crate) fn new(config: TimeLimiterConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder.
    ///
    /// ```
    /// use storefront_resilience_timelimiter::TimeLimiterLayer;
    /// use std::time::Duration;
    ///
    /// let layer = TimeLimiterLayer::builder()
    ///     .name("merchandise")
    ///     .timeout_duration(Duration::from_millis(500))
    ///     .build();
    /// assert_eq!(layer.timeout_duration(), Duration::from_millis(500));
    /// ```
    pub fn builder() -> TimeLimiterConfigBuilder {
        TimeLimiterConfigBuilder::new()
    }

    /// Time allowed for one call.
    pub fn timeout_duration(&self) -> std::time::Duration {
        self.config.timeout_duration
    }
}

impl<S> Layer<S> for TimeLimiterLayer {
    type Service = TimeLimiter<S>;

    fn layer(&self, service: S) -> Self::Service {
        TimeLimiter::new(service, Arc::clone(&self.config))
    }
}
