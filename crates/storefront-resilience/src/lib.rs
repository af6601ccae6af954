//! Named resilience policies for storefront downstream calls.
//!
//! A [`ResiliencePipeline`] maps policy names ("merchandise", "price", "inventory") to an
//! independent set of resilience layers. [`ResiliencePipeline::decorate`] wraps a
//! zero-argument async operation in those layers, outermost first:
//!
//! 1. **Concurrency limiter**: no free permit means `ResourceExhausted`, with no attempt made
//! 2. **Retry**: transient failures are re-issued up to `max_attempts`
//! 3. **Circuit breaker**: an open circuit rejects with `CircuitOpen`, which ends the retry loop
//! 4. **Timeout**: bounds each attempt on its own
//!
//! Callers see a single [`ResilienceError`] taxonomy whatever layer produced the failure.
//!
//! ## Feature Flags
//! - `serde`: deserialize [`PolicyConfig`] from configuration files
//! - `tracing`: logging in every layer
//! - `metrics`: metrics in every layer

mod config;
mod error;
mod pipeline;
#[cfg(feature = "serde")]
pub mod serde_millis;

pub use config::{BackoffKind, PolicyConfig};
pub use error::PipelineError;
pub use pipeline::{Decorated, PolicyHandle, ResiliencePipeline, ResiliencePipelineBuilder};

pub use storefront_resilience_circuitbreaker::{CircuitMetrics, CircuitState};
pub use storefront_resilience_core::{ErrorKind, PolicyName, ResilienceError};
