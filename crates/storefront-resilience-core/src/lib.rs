//! Core infrastructure shared by the storefront resilience layers.
//!
//! This crate provides:
//! - the event hooks every pattern emits through ([`EventListeners`])
//! - [`PolicyName`], the key that ties breaker, retry, timeout and limiter state together
//! - [`ResilienceError`], the failure taxonomy for downstream calls

pub mod error;
pub mod events;
pub mod policy;

pub use error::{ErrorKind, ResilienceError};
pub use events::{EventListeners, ResilienceEvent};
pub use policy::PolicyName;
