use std::time::Duration;
use storefront_resilience_core::{PolicyName, ResilienceError};

/// Rejections produced by the concurrency limiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkheadError {
    /// Every permit was taken and the policy does not wait.
    #[error("bulkhead '{policy}' is full: {max_concurrent} calls in flight")]
    Full {
        policy: PolicyName,
        max_concurrent: usize,
    },
    /// No permit became free within the configured wait.
    #[error("bulkhead '{policy}' stayed full for {waited:?}")]
    WaitTimeout {
        policy: PolicyName,
        max_concurrent: usize,
        waited: Duration,
    },
}

impl BulkheadError {
    /// Policy whose limiter rejected the call.
    pub fn policy(&self) -> &PolicyName {
        match self {
            BulkheadError::Full { policy, .. } | BulkheadError::WaitTimeout { policy, .. } => {
                policy
            }
        }
    }
}

// Both rejections surface as the same failure kind to callers.
impl From<BulkheadError> for ResilienceError {
    fn from(err: BulkheadError) -> Self {
        match err {
            BulkheadError::Full {
                policy,
                max_concurrent,
            }
            | BulkheadError::WaitTimeout {
                policy,
                max_concurrent,
                ..
            } => ResilienceError::ResourceExhausted {
                policy,
                max_concurrent,
            },
        }
    }
}
