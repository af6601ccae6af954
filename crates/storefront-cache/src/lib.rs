//! Best-effort TTL cache for storefront downstream answers.
//!
//! [`CacheService`] is the only component that talks to the [`CacheStore`]. It never
//! fails its caller: a store outage looks like a miss and a failed write returns `false`.
//!
//! Two read paths serve the two caching disciplines:
//! - [`CacheService::get`] returns an entry only before its expiry (cache-aside reads)
//! - [`CacheService::get_stale`] also returns expired entries within a staleness bound
//!   (fallback reads after the source of truth failed)
//!
//! ```rust
//! use storefront_cache::{CacheKey, CacheService};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let cache = CacheService::in_memory(1_000);
//! let key = CacheKey::for_sku("merchandise", 12345);
//!
//! assert!(cache.put(key.as_str(), &"Widget", Duration::from_secs(900)).await);
//! assert_eq!(cache.get::<String>(key.as_str()).await.as_deref(), Some("Widget"));
//! # }
//! ```

mod error;
mod key;
mod service;
mod store;

pub use error::StoreError;
pub use key::CacheKey;
pub use service::CacheService;
pub use store::{CacheStore, InMemoryStore, StoredEntry};
