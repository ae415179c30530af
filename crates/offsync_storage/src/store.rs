//! Durable store trait definition.

use crate::error::{StorageError, StorageResult};
use std::sync::Arc;

/// A durable key/blob store.
///
/// Stores are **opaque blob holders**. The queue owns the snapshot format;
/// the store only has to keep the latest blob for each key.
///
/// # Invariants
///
/// - `get` returns exactly the bytes of the last successful `set`
/// - `set` replaces the previous blob atomically; a failed `set` leaves
///   the previous blob intact
/// - After `set` returns `Ok`, the blob survives process termination
/// - `remove` of a missing key is not an error
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait DurableStore: Send + Sync {
    /// Reads the blob stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or an I/O error occurs.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write cannot be made
    /// durable.
    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removes the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or an I/O error occurs.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<T: DurableStore + ?Sized> DurableStore for Arc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

impl<T: DurableStore + ?Sized> DurableStore for Box<T> {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

/// Checks that a key only uses `[A-Za-z0-9_.-]` and is not empty.
///
/// Every store applies the same rule so that a queue configured against
/// one store can move to another.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] for empty keys, keys starting with
/// a dot, or keys containing other characters.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
