use std::time::Duration;
use storefront_resilience_core::{PolicyName, ResilienceEvent};

/// Events emitted by the concurrency limiter.
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// A permit was acquired.
    CallPermitted {
        policy: PolicyName,
        concurrent_calls: usize,
    },
    /// No permit was available.
    CallRejected {
        policy: PolicyName,
        max_concurrent_calls: usize,
    },
    /// A permitted call returned successfully and released its permit.
    CallFinished {
        policy: PolicyName,
        duration: Duration,
    },
    /// A permitted call returned an error and released its permit.
    CallFailed {
        policy: PolicyName,
        duration: Duration,
    },
}

impl ResilienceEvent for BulkheadEvent {
    fn kind(&self) -> &'static str {
        match self {
            BulkheadEvent::CallPermitted { .. } => "call_permitted",
            BulkheadEvent::CallRejected { .. } => "call_rejected",
            BulkheadEvent::CallFinished { .. } => "call_finished",
            BulkheadEvent::CallFailed { .. } => "call_failed",
        }
    }

    fn policy(&self) -> &PolicyName {
        match self {
            BulkheadEvent::CallPermitted { policy, .. }
            | BulkheadEvent::CallRejected { policy, .. }
            | BulkheadEvent::CallFinished { policy, .. }
            | BulkheadEvent::CallFailed { policy, .. } => policy,
        }
    }
}
