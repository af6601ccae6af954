//! Test organization:
//! - semantics.rs: miss, overwrite, expiry and stale reads through the service
//! - store_failures.rs: a failing backend never fails the caller
//! - concurrency.rs: concurrent readers and writers on one store

mod concurrency;
mod store_failures;
