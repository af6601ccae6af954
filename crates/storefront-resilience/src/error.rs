use storefront_resilience_core::PolicyName;

/// Errors raised while building or looking up policies.
///
/// These are configuration mistakes; they surface when a client is wired up, never while
/// a call is in flight.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// No policy with this name was registered.
    #[error("no resilience policy named '{0}'")]
    UnknownPolicy(PolicyName),

    /// A policy's settings are out of range.
    #[error("invalid resilience policy '{policy}': {reason}")]
    InvalidPolicy { policy: PolicyName, reason: String },
}
