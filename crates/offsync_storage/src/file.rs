//! Directory-backed store for persistent queues.
//!
//! Layout:
//!
//! ```text
//! <dir>/
//! ├─ LOCK              # Advisory lock, one owner process
//! ├─ <key>.blob        # Latest committed blob for <key>
//! └─ <key>.tmp         # In-progress write, renamed over .blob on commit
//! ```

use crate::error::{StorageError, StorageResult};
use crate::store::{validate_key, DurableStore};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCK_FILE: &str = "LOCK";
const BLOB_EXT: &str = "blob";
const TEMP_EXT: &str = "tmp";

/// A file-based durable store.
///
/// Each key maps to one file inside the store directory. Writes go to a
/// temporary file that is fsynced and then renamed over the blob, so a
/// crash leaves either the old or the new blob in place.
///
/// # Thread Safety
///
/// Writes are serialized by an internal mutex. The directory itself is
/// guarded by an advisory `LOCK` file; opening a directory that another
/// process holds fails with [`StorageError::Locked`].
///
/// # Example
///
/// ```no_run
/// use offsync_storage::{DurableStore, FileStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("sync-data")).unwrap();
/// store.set("sync_queue", b"snapshot").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    _lock_file: File,
}

impl FileStore {
    /// Opens a store directory, creating it if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another process holds the
    /// directory, or an I/O error if it cannot be created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        fs::create_dir_all(path)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the keys that currently hold a blob, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BLOB_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.path.join(format!("{key}.{BLOB_EXT}"))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.path.join(format!("{key}.{TEMP_EXT}"))
    }

    #[cfg(unix)]
    fn sync_dir(&self) -> StorageResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        match fs::read(self.blob_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        let _guard = self.write_lock.lock();

        let temp = self.temp_path(key);
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp)?;
            file.write_all(value)?;
            file.sync_all()?;
        }

        fs::rename(&temp, self.blob_path(key))?;
        self.sync_dir()?;
        debug!(key, bytes = value.len(), "blob committed");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let _guard = self.write_lock.lock();

        match fs::remove_file(self.blob_path(key)) {
            Ok(()) => self.sync_dir(),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_open_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store");

        let store = FileStore::open(&path).unwrap();
        assert!(path.is_dir());
        assert_eq!(store.path(), path);
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn file_set_and_get() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert!(store.get("queue").unwrap().is_none());
        store.set("queue", b"hello").unwrap();
        assert_eq!(store.get("queue").unwrap().unwrap(), b"hello");

        store.set("queue", b"replaced").unwrap();
        assert_eq!(store.get("queue").unwrap().unwrap(), b"replaced");
        assert!(!store.temp_path("queue").exists());
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();

        {
            let store = FileStore::open(dir.path()).unwrap();
            store.set("queue", b"persistent data").unwrap();
        }

        {
            let store = FileStore::open(dir.path()).unwrap();
            assert_eq!(store.get("queue").unwrap().unwrap(), b"persistent data");
            assert_eq!(store.keys().unwrap(), vec!["queue".to_string()]);
        }
    }

    #[test]
    fn file_remove() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.set("queue", b"data").unwrap();
        store.remove("queue").unwrap();
        assert!(store.get("queue").unwrap().is_none());
        store.remove("queue").unwrap();
    }

    #[test]
    fn file_second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _first = FileStore::open(dir.path()).unwrap();

        let second = FileStore::open(dir.path());
        assert!(matches!(second, Err(StorageError::Locked)));
    }

    #[test]
    fn file_stale_temp_is_ignored() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("queue", b"committed").unwrap();

        // A crash mid-write leaves a temp file behind
        fs::write(store.temp_path("queue"), b"partial").unwrap();

        assert_eq!(store.get("queue").unwrap().unwrap(), b"committed");
        assert_eq!(store.keys().unwrap(), vec!["queue".to_string()]);
    }

    #[test]
    fn file_rejects_invalid_key() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.get("../outside"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
