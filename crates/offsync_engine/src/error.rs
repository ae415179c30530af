//! Error types for the sync engine.

use offsync_queue::{QueueError, SyncType};
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced to callers of the coordinator.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The strategy rejected the data; nothing was enqueued.
    #[error("{sync_type} data rejected by validation")]
    Validation {
        /// Task kind of the rejected data.
        sync_type: SyncType,
    },

    /// No strategy is registered for the task kind.
    #[error("no strategy registered for {0}")]
    StrategyMissing(SyncType),

    /// The queue failed.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Diagnostics could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Failure of one upload attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// Worth retrying after a backoff (network loss, timeouts, 5xx).
    #[error("transient upload failure: {0}")]
    Transient(String),

    /// Retrying cannot help (rejected data, 4xx).
    #[error("permanent upload failure: {0}")]
    Permanent(String),
}

impl UploadError {
    /// Creates a retryable upload error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    /// Creates a non-retryable upload error.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    /// Returns true if the attempt may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadError::Transient(_))
    }

    /// Returns the failure message without the classification prefix.
    pub fn message(&self) -> &str {
        match self {
            UploadError::Transient(m) | UploadError::Permanent(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(UploadError::transient("connection lost").is_retryable());
        assert!(!UploadError::permanent("invalid payload").is_retryable());
    }

    #[test]
    fn error_display() {
        let err = EngineError::StrategyMissing(SyncType::Photo);
        assert_eq!(err.to_string(), "no strategy registered for photo");

        let err = EngineError::Validation {
            sync_type: SyncType::Meal,
        };
        assert!(err.to_string().contains("meal"));

        let err = UploadError::transient("503");
        assert_eq!(err.message(), "503");
        assert!(err.to_string().contains("transient"));
    }
}
