//! CLI command implementations.

pub mod inspect;
pub mod list;
pub mod maintain;
pub mod transfer;

use offsync_queue::{PersistentQueue, QueueConfig};
use offsync_storage::FileStore;
use std::path::Path;

/// Queue type every command operates on.
pub type CliQueue = PersistentQueue<FileStore>;

/// Opens the queue stored under `key` in the directory at `path`.
pub fn open_queue(path: &Path, key: &str) -> Result<CliQueue, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No queue store found at {:?}", path).into());
    }
    let store = FileStore::open(path)?;
    Ok(PersistentQueue::open(store, QueueConfig::new(key))?)
}

/// Formats unix millis for display.
pub(crate) fn format_millis(millis: Option<u64>) -> String {
    match millis {
        Some(ms) => format!("{}.{:03}", ms / 1000, ms % 1000),
        None => "-".to_string(),
    }
}
