//! Per-policy concurrency limiter (bulkhead) for storefront downstream calls.
//!
//! Each policy gets a fixed pool of permits. A call holds one permit from admission until
//! its future completes or is dropped; when the pool is empty the call either fails fast
//! or waits up to `max_wait_duration`, and is otherwise rejected with
//! [`BulkheadError`], which converts into
//! [`ResilienceError::ResourceExhausted`](storefront_resilience_core::ResilienceError::ResourceExhausted).
//!
//! # Example
//!
//! ```rust
//! use tower::{ServiceBuilder, ServiceExt};
//! use storefront_resilience_bulkhead::BulkheadConfig;
//! use storefront_resilience_core::ResilienceError;
//!
//! # async fn example() {
//! let layer = BulkheadConfig::builder()
//!     .name("merchandise")
//!     .max_concurrent_calls(10)
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(layer)
//!     .service_fn(|sku: u64| async move { Ok::<_, ResilienceError>(sku) });
//!
//! assert_eq!(service.oneshot(7).await, Ok(7));
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod layer;
pub mod service;

pub use config::{BulkheadConfig, BulkheadConfigBuilder};
pub use error::BulkheadError;
pub use events::BulkheadEvent;
pub use layer::BulkheadLayer;
pub use service::Bulkhead;
