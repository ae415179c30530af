//! # offsync Queue
//!
//! Durable, priority-ordered retry queue for offline-first sync.
//!
//! This crate provides:
//! - The closed set of task kinds ([`SyncType`]) and their typed payloads
//! - [`SyncPayload`] with retry bookkeeping
//! - [`PersistentQueue`], which persists its whole collection on every
//!   mutation
//! - Backoff scheduling ([`BackoffSchedule`]) and an injectable [`Clock`]
//!
//! ## Key Invariants
//!
//! - Payloads are ordered by priority (1 first), FIFO within a priority
//! - `retry_count <= max_retries`; a payload at its budget is terminally
//!   failed and never returned by [`PersistentQueue::get_ready`]
//! - `next_retry_at` is unset until the first failure
//! - Every mutation is written to the store before the call returns

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backoff;
mod clock;
mod codec;
mod config;
mod error;
mod payload;
mod queue;
mod stats;
mod task;

pub use backoff::BackoffSchedule;
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::SNAPSHOT_VERSION;
pub use config::{QueueConfig, WritePolicy, DEFAULT_STORAGE_KEY};
pub use error::{QueueError, QueueResult};
pub use payload::{
    clamp_priority, PayloadDraft, PayloadId, PayloadState, RetryOutcome, SyncPayload,
    PRIORITY_HIGHEST, PRIORITY_LOWEST,
};
pub use queue::PersistentQueue;
pub use stats::QueueStats;
pub use task::{
    MealItem, MealKind, MealSubmission, MenuRefresh, ParseSyncTypeError, PhotoAnalysis,
    ProfileUpdate, SyncData, SyncType, TaskData,
};
