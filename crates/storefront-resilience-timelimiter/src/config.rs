use crate::events::TimeLimiterEvent;
use crate::TimeLimiterLayer;
use std::time::Duration;
use storefront_resilience_core::{EventListeners, PolicyName};

/// One policy's per-attempt deadline.
pub(crate) struct TimeLimiterConfig {
    pub(crate) name: PolicyName,
    pub(crate) timeout_duration: Duration,
    pub(crate) event_listeners: EventListeners<TimeLimiterEvent>,
}

/// Builder for [`TimeLimiterLayer`].
pub struct TimeLimiterConfigBuilder {
    config: TimeLimiterConfig,
}

impl TimeLimiterConfigBuilder {
    pub(crate) fn new() -> Self {
        Self {
            config: TimeLimiterConfig {
                name: PolicyName::new("<unnamed>"),
                timeout_duration: Duration::from_secs(2),
                event_listeners: EventListeners::new(),
            },
        }
    }

    /// Deadline for each attempt. Default: 2 seconds
    pub fn timeout_duration(mut self, duration: Duration) -> Self {
        self.config.timeout_duration = duration;
        self
    }

    pub fn name(mut self, name: impl Into<PolicyName>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Registers a callback invoked with the deadline each time an attempt is abandoned.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.config.event_listeners.add(move |event| {
            let TimeLimiterEvent::Timeout {
                timeout_duration, ..
            } = event;
            f(*timeout_duration);
        });
        self
    }

    pub fn build(self) -> TimeLimiterLayer {
        TimeLimiterLayer::new(self.config)
    }
}
