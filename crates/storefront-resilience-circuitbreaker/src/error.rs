use storefront_resilience_core::{PolicyName, ResilienceError};
use thiserror::Error;

/// Rejection produced when the circuit does not admit a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker '{policy}' is open; call not permitted")]
pub struct CircuitOpenError {
    /// Policy whose breaker rejected the call.
    pub policy: PolicyName,
}

impl From<CircuitOpenError> for ResilienceError {
    fn from(err: CircuitOpenError) -> Self {
        ResilienceError::CircuitOpen { policy: err.policy }
    }
}
