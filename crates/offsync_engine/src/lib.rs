//! # offsync Engine
//!
//! Strategy-driven coordinator that drains the offsync queue.
//!
//! This crate provides:
//! - The [`SyncStrategy`] trait, one implementation per task kind
//! - [`SyncCoordinator`], which validates and enqueues work, then uploads it
//!   when online
//! - Connectivity plumbing ([`ConnectivityMonitor`], [`ConnectivityListener`])
//! - Reference strategies for profiles, meals, menus and photos
//!   ([`strategies`])
//!
//! ## Architecture
//!
//! ```text
//!  producer ──sync()──▶ validate ─▶ prepare ─▶ PersistentQueue
//!                                                    │
//!  connectivity / enqueue / resume ──▶ drain ◀───────┘
//!                                        │ one payload at a time
//!                                        ▼
//!                        strategy.upload ─▶ on_success ─▶ remove
//!                                        └▶ on_failure ─▶ backoff / fail
//! ```
//!
//! ## Key Invariants
//!
//! - At most one drain runs at a time; concurrent requests are skipped
//! - Uploads never overlap, across all strategies
//! - A failing payload never stops the rest of a drain
//! - Invalid data is rejected before it reaches the queue

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connectivity;
mod coordinator;
mod error;
mod state;
mod strategy;
pub mod strategies;

pub use config::EngineConfig;
pub use connectivity::{ConnectivityListener, ConnectivityMonitor};
pub use coordinator::SyncCoordinator;
pub use error::{EngineError, EngineResult, UploadError};
pub use state::{
    EngineState, FailureKind, GlobalSyncStatus, ItemFailure, SkipReason, SyncDiagnostics,
    SyncReport,
};
pub use strategy::SyncStrategy;
