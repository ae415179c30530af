//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The key contains characters the store cannot map to a file name.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Another process holds the store directory.
    #[error("store directory is locked by another process")]
    Locked,

    /// The store refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
