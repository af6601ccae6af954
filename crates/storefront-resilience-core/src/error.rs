//! Failure taxonomy for downstream calls.
//!
//! [`ResilienceError`] is the single error type that flows through a decorated downstream
//! call. The remote transport produces the transport-level variants
//! (`ConnectionFailure`, `RemoteServerError`, `ClientError`, `MalformedResponse`); the
//! pipeline layers produce the rest (`Timeout`, `CircuitOpen`, `ResourceExhausted`).
//!
//! Each pattern crate defines its own small rejection error and a `From` conversion into
//! this type, so a layer only requires `S::Error: From<ItsError>`:
//!
//! ```rust
//! use storefront_resilience_core::{ErrorKind, ResilienceError};
//!
//! let err = ResilienceError::server(503, "upstream overloaded");
//! assert!(err.is_transient());
//! assert_eq!(err.kind(), ErrorKind::RemoteServerError);
//!
//! let err = ResilienceError::malformed("missing field `price`");
//! assert!(!err.is_transient());
//! ```

use crate::policy::PolicyName;
use std::fmt;
use std::time::Duration;

/// Why a downstream call did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResilienceError {
    /// A single attempt exceeded its time limit.
    #[error("call under policy '{policy}' timed out after {after:?}")]
    Timeout {
        /// Policy whose time limiter fired.
        policy: PolicyName,
        /// The configured limit.
        after: Duration,
    },

    /// The remote service could not be reached.
    #[error("connection failure: {message}")]
    ConnectionFailure {
        /// Transport diagnostic.
        message: String,
    },

    /// The remote service answered with a 5xx status.
    #[error("remote server error {status}: {message}")]
    RemoteServerError {
        /// HTTP status code.
        status: u16,
        /// Response diagnostic.
        message: String,
    },

    /// The remote service rejected the request (non-2xx, non-5xx status).
    #[error("request rejected with status {status}: {message}")]
    ClientError {
        /// HTTP status code.
        status: u16,
        /// Response diagnostic.
        message: String,
    },

    /// The response could not be decoded into the expected shape.
    #[error("malformed response: {message}")]
    MalformedResponse {
        /// Decoder diagnostic.
        message: String,
    },

    /// The circuit breaker for the policy is open; the operation was not invoked.
    #[error("circuit breaker '{policy}' is open")]
    CircuitOpen {
        /// Policy whose breaker rejected the call.
        policy: PolicyName,
    },

    /// No concurrency permit was available for the policy.
    #[error("concurrency limit for '{policy}' reached ({max_concurrent} in flight)")]
    ResourceExhausted {
        /// Policy whose limiter rejected the call.
        policy: PolicyName,
        /// Configured limiter capacity.
        max_concurrent: usize,
    },
}

/// Field-less classification of a [`ResilienceError`], used as a log and metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorKind {
    /// See [`ResilienceError::Timeout`].
    Timeout,
    /// See [`ResilienceError::ConnectionFailure`].
    ConnectionFailure,
    /// See [`ResilienceError::RemoteServerError`].
    RemoteServerError,
    /// See [`ResilienceError::ClientError`].
    ClientError,
    /// See [`ResilienceError::MalformedResponse`].
    MalformedResponse,
    /// See [`ResilienceError::CircuitOpen`].
    CircuitOpen,
    /// See [`ResilienceError::ResourceExhausted`].
    ResourceExhausted,
}

impl ErrorKind {
    /// Stable snake_case label.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionFailure => "connection_failure",
            ErrorKind::RemoteServerError => "remote_server_error",
            ErrorKind::ClientError => "client_error",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::ResourceExhausted => "resource_exhausted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResilienceError {
    /// Builds a [`ResilienceError::ConnectionFailure`].
    pub fn connection(message: impl Into<String>) -> Self {
        ResilienceError::ConnectionFailure {
            message: message.into(),
        }
    }

    /// Builds a [`ResilienceError::RemoteServerError`].
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        ResilienceError::RemoteServerError {
            status,
            message: message.into(),
        }
    }

    /// Builds a [`ResilienceError::ClientError`].
    pub fn client(status: u16, message: impl Into<String>) -> Self {
        ResilienceError::ClientError {
            status,
            message: message.into(),
        }
    }

    /// Builds a [`ResilienceError::MalformedResponse`].
    pub fn malformed(message: impl Into<String>) -> Self {
        ResilienceError::MalformedResponse {
            message: message.into(),
        }
    }

    /// The field-less kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResilienceError::Timeout { .. } => ErrorKind::Timeout,
            ResilienceError::ConnectionFailure { .. } => ErrorKind::ConnectionFailure,
            ResilienceError::RemoteServerError { .. } => ErrorKind::RemoteServerError,
            ResilienceError::ClientError { .. } => ErrorKind::ClientError,
            ResilienceError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            ResilienceError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            ResilienceError::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
        }
    }

    /// Returns `true` for failures worth re-attempting: timeouts, connection failures
    /// and 5xx responses.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ResilienceError::Timeout { .. }
                | ResilienceError::ConnectionFailure { .. }
                | ResilienceError::RemoteServerError { .. }
        )
    }

    /// Returns `true` if the pipeline itself refused the call without invoking the
    /// operation.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ResilienceError::CircuitOpen { .. } | ResilienceError::ResourceExhausted { .. }
        )
    }

    /// Returns `true` if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResilienceError::Timeout { .. })
    }

    /// Returns `true` if the breaker rejected the call.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }
}
