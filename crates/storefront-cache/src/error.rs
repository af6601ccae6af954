/// Failure reported by a [`CacheStore`](crate::CacheStore) backend.
///
/// The cache service logs these and degrades to a miss; they never reach its callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or did not answer.
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with an error.
    #[error("cache store command failed: {0}")]
    Command(String),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable(message.into())
    }

    pub fn command(message: impl Into<String>) -> Self {
        StoreError::Command(message.into())
    }
}
