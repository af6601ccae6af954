use std::time::Duration;
use storefront_resilience_core::{PolicyName, ResilienceError};

/// An attempt did not complete within the policy's timeout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("call under policy '{policy}' timed out after {after:?}")]
pub struct TimeoutError {
    pub policy: PolicyName,
    pub after: Duration,
}

impl From<TimeoutError> for ResilienceError {
    fn from(err: TimeoutError) -> Self {
        ResilienceError::Timeout {
            policy: err.policy,
            after: err.after,
        }
    }
}
