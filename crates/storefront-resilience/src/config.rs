use crate::PipelineError;
use std::time::Duration;
use storefront_resilience_core::PolicyName;

/// How the delay between retries evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BackoffKind {
    /// `retry_delay` before every retry.
    #[default]
    Fixed,
    /// `retry_delay` multiplied by `backoff_multiplier` after each retry.
    Exponential,
}

/// Settings for one named policy: timeout, breaker, retry and limiter.
///
/// With the `serde` feature, durations are read and written as integer milliseconds under
/// `*_ms` keys, and every field falls back to its default when absent:
///
/// ```toml
/// timeout_ms = 500
/// max_attempts = 3
/// retry_delay_ms = 100
/// failure_rate_threshold = 0.5
/// max_concurrent_calls = 50
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct PolicyConfig {
    #[cfg_attr(feature = "serde", serde(rename = "timeout_ms", with = "crate::serde_millis"))]
    pub timeout: Duration,

    /// Attempts per call, initial attempt included.
    pub max_attempts: usize,
    #[cfg_attr(feature = "serde", serde(rename = "retry_delay_ms", with = "crate::serde_millis"))]
    pub retry_delay: Duration,
    pub backoff: BackoffKind,
    pub backoff_multiplier: f64,
    /// Spread applied to exponential delays, in `[0, 1]`. Zero disables jitter.
    pub backoff_jitter: f64,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "max_retry_delay_ms", with = "crate::serde_millis::option")
    )]
    pub max_retry_delay: Option<Duration>,

    pub failure_rate_threshold: f64,
    /// Count-based window over the most recent calls.
    pub sliding_window_size: usize,
    /// Outcomes needed before the rate is evaluated; capped at `sliding_window_size`.
    pub minimum_number_of_calls: usize,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "wait_duration_in_open_ms", with = "crate::serde_millis")
    )]
    pub wait_duration_in_open: Duration,
    pub permitted_calls_in_half_open: usize,

    pub max_concurrent_calls: usize,
    /// How long a call may wait for a permit; zero fails fast.
    #[cfg_attr(feature = "serde", serde(rename = "max_wait_ms", with = "crate::serde_millis"))]
    pub max_wait: Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            max_attempts: 3,
            retry_delay: Duration::from_millis(100),
            backoff: BackoffKind::Fixed,
            backoff_multiplier: 2.0,
            backoff_jitter: 0.0,
            max_retry_delay: None,
            failure_rate_threshold: 0.5,
            sliding_window_size: 20,
            minimum_number_of_calls: 10,
            wait_duration_in_open: Duration::from_secs(30),
            permitted_calls_in_half_open: 3,
            max_concurrent_calls: 25,
            max_wait: Duration::ZERO,
        }
    }
}

impl PolicyConfig {
    /// Checks that every setting is usable.
    pub fn validate(&self, policy: &PolicyName) -> Result<(), PipelineError> {
        let invalid = |reason: &str| {
            Err(PipelineError::InvalidPolicy {
                policy: policy.clone(),
                reason: reason.to_string(),
            })
        };

        if self.timeout.is_zero() {
            return invalid("timeout must be greater than zero");
        }
        if self.max_attempts == 0 {
            return invalid("max_attempts must be at least 1");
        }
        if !(self.failure_rate_threshold > 0.0 && self.failure_rate_threshold <= 1.0) {
            return invalid("failure_rate_threshold must be in (0, 1]");
        }
        if self.sliding_window_size == 0 {
            return invalid("sliding_window_size must be at least 1");
        }
        if self.minimum_number_of_calls == 0 {
            return invalid("minimum_number_of_calls must be at least 1");
        }
        if self.permitted_calls_in_half_open == 0 {
            return invalid("permitted_calls_in_half_open must be at least 1");
        }
        if self.max_concurrent_calls == 0 {
            return invalid("max_concurrent_calls must be at least 1");
        }
        if self.backoff == BackoffKind::Exponential && self.backoff_multiplier < 1.0 {
            return invalid("backoff_multiplier must be at least 1.0");
        }
        if !(0.0..=1.0).contains(&self.backoff_jitter) {
            return invalid("backoff_jitter must be in [0, 1]");
        }
        Ok(())
    }
}
