use std::time::Duration;
use storefront_resilience_core::{PolicyName, ResilienceEvent};

/// Events emitted by the retry middleware.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A failed attempt will be re-issued after `delay`.
    Retry {
        policy: PolicyName,
        attempt: usize,
        delay: Duration,
    },
    /// An attempt succeeded. `attempts` counts the initial call.
    Success {
        policy: PolicyName,
        attempts: usize,
    },
    /// Every permitted attempt failed with a retryable error.
    Exhausted {
        policy: PolicyName,
        attempts: usize,
    },
    /// An attempt failed with an error the predicate does not retry.
    IgnoredError {
        policy: PolicyName,
        attempts: usize,
    },
}

impl ResilienceEvent for RetryEvent {
    fn kind(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::IgnoredError { .. } => "ignored_error",
        }
    }

    fn policy(&self) -> &PolicyName {
        match self {
            RetryEvent::Retry { policy, .. }
            | RetryEvent::Success { policy, .. }
            | RetryEvent::Exhausted { policy, .. }
            | RetryEvent::IgnoredError { policy, .. } => policy,
        }
    }
}
