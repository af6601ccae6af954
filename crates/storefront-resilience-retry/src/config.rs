use crate::backoff::{ExponentialBackoff, FixedInterval, IntervalFunction};
use crate::events::RetryEvent;
use crate::RetryLayer;
use std::sync::Arc;
use std::time::Duration;
use storefront_resilience_core::{EventListeners, PolicyName};

pub(crate) type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Configuration for the retry middleware.
pub struct RetryConfig<E> {
    pub(crate) name: PolicyName,
    pub(crate) max_attempts: usize,
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) retry_predicate: Option<RetryPredicate<E>>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
}

impl<E> RetryConfig<E> {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    /// The policy this retry belongs to.
    pub fn name(&self) -> &PolicyName {
        &self.name
    }

    /// Total attempts, including the initial call.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub(crate) fn should_retry(&self, error: &E) -> bool {
        self.retry_predicate
            .as_ref()
            .map_or(true, |predicate| predicate(error))
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    name: PolicyName,
    max_attempts: usize,
    interval_fn: Option<Arc<dyn IntervalFunction>>,
    retry_predicate: Option<RetryPredicate<E>>,
    event_listeners: EventListeners<RetryEvent>,
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryConfigBuilder<E> {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_attempts: 3
    /// - backoff: exponential with 100ms initial interval
    /// - predicate: every error is retried
    pub fn new() -> Self {
        Self {
            name: PolicyName::new("<unnamed>"),
            max_attempts: 3,
            interval_fn: None,
            retry_predicate: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Names the policy this retry belongs to (used in events and logs).
    pub fn name(mut self, name: impl Into<PolicyName>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the maximum number of attempts.
    ///
    /// This includes the initial attempt, so `max_attempts(3)` means one call plus up
    /// to two retries. Values below 1 are raised to 1.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Waits `duration` before every retry.
    pub fn fixed_backoff(mut self, duration: Duration) -> Self {
        self.interval_fn = Some(Arc::new(FixedInterval::new(duration)));
        self
    }

    /// Doubles the wait before each retry, starting at `initial_interval`.
    pub fn exponential_backoff(mut self, initial_interval: Duration) -> Self {
        self.interval_fn = Some(Arc::new(ExponentialBackoff::new(initial_interval)));
        self
    }

    /// Sets a custom interval function.
    pub fn backoff<I>(mut self, interval_fn: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval_fn = Some(Arc::new(interval_fn));
        self
    }

    /// Restricts retries to errors for which `predicate` returns true.
    ///
    /// ```rust
    /// use storefront_resilience_core::ResilienceError;
    /// use storefront_resilience_retry::RetryLayer;
    ///
    /// let layer = RetryLayer::<ResilienceError>::builder()
    ///     .name("price")
    ///     .retry_on(ResilienceError::is_transient)
    ///     .build();
    /// ```
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Registers a callback invoked before each retry with `(attempt, delay)`.
    ///
    /// `attempt` is the number of the attempt that just failed, starting at 1.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        });
        self
    }

    /// Registers a callback invoked on success with the number of attempts made.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        });
        self
    }

    /// Registers a callback invoked when every attempt failed.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        });
        self
    }

    /// Registers a callback invoked when an error is returned without retrying.
    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if matches!(event, RetryEvent::IgnoredError { .. }) {
                f();
            }
        });
        self
    }

    pub(crate) fn into_config(self) -> RetryConfig<E> {
        RetryConfig {
            name: self.name,
            max_attempts: self.max_attempts,
            interval_fn: self
                .interval_fn
                .unwrap_or_else(|| Arc::new(ExponentialBackoff::new(Duration::from_millis(100)))),
            retry_predicate: self.retry_predicate,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds the layer.
    pub fn build(self) -> RetryLayer<E> {
        RetryLayer::new(self.into_config())
    }
}
