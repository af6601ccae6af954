//! Test organization:
//! - cache_aside.rs: merchandise and price style clients
//! - fallback_only.rs: inventory style client, stale reads and the sentinel

mod cache_aside;
mod fallback_only;
