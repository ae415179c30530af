//! # offsync Storage
//!
//! Durable key/blob stores for the offsync queue.
//!
//! A store keeps **one opaque blob per key** and replaces it atomically.
//! The queue serializes its whole collection into a single blob, so a
//! reader that looks at the store after any queue call sees a complete
//! snapshot, never a half-written one.
//!
//! ## Design Principles
//!
//! - Stores do not interpret the bytes they hold
//! - `set` is all-or-nothing: the previous blob or the new one, nothing else
//! - Stores must be `Send + Sync`
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral queues
//! - [`FileStore`] - Directory-backed persistent storage
//!
//! ## Example
//!
//! ```rust
//! use offsync_storage::{DurableStore, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! store.set("queue", b"snapshot").unwrap();
//! assert_eq!(store.get("queue").unwrap().as_deref(), Some(&b"snapshot"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use store::{validate_key, DurableStore};
