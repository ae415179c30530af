//! In-memory store for testing.

use crate::error::{StorageError, StorageResult};
use crate::store::{validate_key, DurableStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// An in-memory durable store.
///
/// This store keeps all blobs in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral queues that don't need persistence
///
/// Writes can be made to fail on demand with [`InMemoryStore::set_fail_writes`],
/// which is how the queue's write-failure policies are exercised.
///
/// # Example
///
/// ```rust
/// use offsync_storage::{DurableStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.set("queue", b"v1").unwrap();
/// store.set("queue", b"v2").unwrap();
/// assert_eq!(store.get("queue").unwrap().unwrap(), b"v2");
/// assert_eq!(store.write_count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with a pre-existing blob.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_blob(key: impl Into<String>, value: Vec<u8>) -> Self {
        let store = Self::new();
        store.blobs.write().insert(key.into(), value);
        store
    }

    /// Makes every following `set` and `remove` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns the stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("writes disabled".into()))
        } else {
            Ok(())
        }
    }
}

impl DurableStore for InMemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.blobs.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.blobs.write().insert(key.to_string(), value.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.blobs.write().remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.keys().is_empty());
        assert!(store.get("queue").unwrap().is_none());
    }

    #[test]
    fn memory_set_replaces_blob() {
        let store = InMemoryStore::new();
        store.set("queue", b"first").unwrap();
        store.set("queue", b"second").unwrap();

        assert_eq!(store.get("queue").unwrap().unwrap(), b"second");
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn memory_remove() {
        let store = InMemoryStore::new();
        store.set("queue", b"data").unwrap();
        store.remove("queue").unwrap();
        assert!(store.get("queue").unwrap().is_none());

        // Removing again is fine
        store.remove("queue").unwrap();
    }

    #[test]
    fn memory_with_blob() {
        let store = InMemoryStore::with_blob("queue", b"preloaded".to_vec());
        assert_eq!(store.get("queue").unwrap().unwrap(), b"preloaded");
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn memory_failed_write_keeps_previous_blob() {
        let store = InMemoryStore::new();
        store.set("queue", b"good").unwrap();

        store.set_fail_writes(true);
        let result = store.set("queue", b"lost");
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
        assert_eq!(store.get("queue").unwrap().unwrap(), b"good");

        store.set_fail_writes(false);
        store.set("queue", b"recovered").unwrap();
        assert_eq!(store.get("queue").unwrap().unwrap(), b"recovered");
    }

    #[test]
    fn memory_rejects_invalid_key() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.set("a/b", b"x"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn shared_store_through_arc() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        let handle = std::sync::Arc::clone(&store);
        handle.set("queue", b"shared").unwrap();
        assert_eq!(store.get("queue").unwrap().unwrap(), b"shared");
    }
}
