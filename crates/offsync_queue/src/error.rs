//! Error types for queue operations.

use offsync_storage::StorageError;
use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur during queue operations.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The durable store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A snapshot or export could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The stored snapshot was written by an unknown format version.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the snapshot.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// No payload with the given id.
    #[error("payload not found: {0}")]
    NotFound(String),
}

impl QueueError {
    /// Returns true if this error came from the durable store.
    pub fn is_storage(&self) -> bool {
        matches!(self, QueueError::Storage(_))
    }
}
