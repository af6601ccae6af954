use crate::CircuitState;
use std::time::Duration;
use storefront_resilience_core::{PolicyName, ResilienceEvent};

/// Events emitted by a circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The circuit moved between states.
    StateTransition {
        policy: PolicyName,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// A call was admitted.
    CallPermitted {
        policy: PolicyName,
        state: CircuitState,
    },
    /// A call was rejected without invoking the operation.
    CallRejected {
        policy: PolicyName,
        state: CircuitState,
    },
    /// A successful outcome was recorded.
    SuccessRecorded {
        policy: PolicyName,
        state: CircuitState,
        duration: Duration,
    },
    /// A failed outcome was recorded.
    FailureRecorded {
        policy: PolicyName,
        state: CircuitState,
        duration: Duration,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn kind(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn policy(&self) -> &PolicyName {
        match self {
            CircuitBreakerEvent::StateTransition { policy, .. }
            | CircuitBreakerEvent::CallPermitted { policy, .. }
            | CircuitBreakerEvent::CallRejected { policy, .. }
            | CircuitBreakerEvent::SuccessRecorded { policy, .. }
            | CircuitBreakerEvent::FailureRecorded { policy, .. } => policy,
        }
    }
}
