//! `#[serde(with = ...)]` helpers that read and write [`Duration`]s as integer milliseconds.
//!
//! ```rust
//! use std::time::Duration;
//!
//! #[derive(serde::Deserialize)]
//! struct Deadline {
//!     #[serde(rename = "timeout_ms", with = "storefront_resilience::serde_millis")]
//!     timeout: Duration,
//! }
//!
//! let deadline: Deadline = serde_json::from_str(r#"{"timeout_ms": 250}"#).unwrap();
//! assert_eq!(deadline.timeout, Duration::from_millis(250));
//! ```

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// The same encoding for `Option<Duration>`; an absent or null value is `None`.
pub mod option {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => super::serialize(duration, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}
