//! Configuration for the concurrency limiter.

use crate::events::BulkheadEvent;
use crate::BulkheadLayer;
use std::time::Duration;
use storefront_resilience_core::{EventListeners, PolicyName};

/// Configuration for one policy's concurrency limiter.
#[derive(Clone, Debug)]
pub struct BulkheadConfig {
    pub(crate) name: PolicyName,
    pub(crate) max_concurrent_calls: usize,
    /// Zero rejects immediately when full.
    pub(crate) max_wait_duration: Duration,
    pub(crate) event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::new()
    }

    /// The policy this limiter belongs to.
    pub fn name(&self) -> &PolicyName {
        &self.name
    }

    /// Maximum number of calls in flight.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_concurrent_calls
    }
}

/// Builder for [`BulkheadConfig`].
pub struct BulkheadConfigBuilder {
    name: PolicyName,
    max_concurrent_calls: usize,
    max_wait_duration: Duration,
    event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: PolicyName::new("<unnamed>"),
            max_concurrent_calls: 25,
            max_wait_duration: Duration::ZERO,
            event_listeners: EventListeners::new(),
        }
    }

    /// Names the policy this limiter protects.
    pub fn name(mut self, name: impl Into<PolicyName>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the maximum number of concurrent calls.
    ///
    /// Default: 25
    pub fn max_concurrent_calls(mut self, max: usize) -> Self {
        self.max_concurrent_calls = max.max(1);
        self
    }

    /// Sets how long a call may wait for a permit when the limiter is full.
    ///
    /// `Duration::ZERO` rejects immediately.
    /// Default: zero
    pub fn max_wait_duration(mut self, duration: Duration) -> Self {
        self.max_wait_duration = duration;
        self
    }

    /// Registers a callback when a call acquires a permit.
    ///
    /// Called with the number of calls in flight, including this one.
    ///
    /// # Example
    /// ```rust
    /// use storefront_resilience_bulkhead::BulkheadConfig;
    ///
    /// let layer = BulkheadConfig::builder()
    ///     .name("inventory")
    ///     .max_concurrent_calls(10)
    ///     .on_call_permitted(|in_flight| {
    ///         if in_flight >= 8 {
    ///             eprintln!("inventory limiter near capacity: {in_flight}");
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let BulkheadEvent::CallPermitted {
                concurrent_calls, ..
            } = event
            {
                f(*concurrent_calls);
            }
        });
        self
    }

    /// Registers a callback when a call is rejected, with the configured capacity.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let BulkheadEvent::CallRejected {
                max_concurrent_calls,
                ..
            } = event
            {
                f(*max_concurrent_calls);
            }
        });
        self
    }

    /// Registers a callback when a permitted call completes successfully.
    pub fn on_call_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let BulkheadEvent::CallFinished { duration, .. } = event {
                f(*duration);
            }
        });
        self
    }

    /// Registers a callback when a permitted call fails.
    pub fn on_call_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(move |event| {
            if let BulkheadEvent::CallFailed { duration, .. } = event {
                f(*duration);
            }
        });
        self
    }

    pub(crate) fn into_config(self) -> BulkheadConfig {
        BulkheadConfig {
            name: self.name,
            max_concurrent_calls: self.max_concurrent_calls,
            max_wait_duration: self.max_wait_duration,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds the layer. Every service produced by the layer shares one set of permits.
    pub fn build(self) -> BulkheadLayer {
        BulkheadLayer::new(self.into_config())
    }
}

impl Default for BulkheadConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
