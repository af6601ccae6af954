use std::time::Duration;
use storefront_resilience_core::{PolicyName, ResilienceEvent};

/// Events emitted by the time limiter.
#[derive(Debug, Clone)]
pub enum TimeLimiterEvent {
    /// The attempt was abandoned when its deadline elapsed.
    Timeout {
        policy: PolicyName,
        timeout_duration: Duration,
    },
}

impl ResilienceEvent for TimeLimiterEvent {
    fn kind(&self) -> &'static str {
        "timeout"
    }

    fn policy(&self) -> &PolicyName {
        let TimeLimiterEvent::Timeout { policy, .. } = self;
        policy
    }
}
