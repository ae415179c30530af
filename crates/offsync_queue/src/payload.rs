//! Queue payloads and their retry bookkeeping.

use crate::task::{SyncData, SyncType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Highest priority; processed first.
pub const PRIORITY_HIGHEST: u8 = 1;
/// Lowest priority; processed last.
pub const PRIORITY_LOWEST: u8 = 5;

/// Clamps a priority into `[PRIORITY_HIGHEST, PRIORITY_LOWEST]`.
pub fn clamp_priority(priority: u8) -> u8 {
    priority.clamp(PRIORITY_HIGHEST, PRIORITY_LOWEST)
}

/// Unique identifier of a payload, assigned at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadId(Uuid);

impl PayloadId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PayloadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PayloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PayloadId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A payload before it enters the queue: data plus enqueue policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadDraft {
    /// Task content.
    pub data: SyncData,
    /// Requested priority; clamped on enqueue.
    pub priority: u8,
    /// Retry budget.
    pub max_retries: u32,
}

impl PayloadDraft {
    /// Creates a draft.
    pub fn new(data: impl Into<SyncData>, priority: u8, max_retries: u32) -> Self {
        Self {
            data: data.into(),
            priority,
            max_retries,
        }
    }
}

/// Where a payload stands in its retry lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadState {
    /// Eligible for processing now.
    Ready,
    /// Waiting for its backoff to expire.
    BackingOff {
        /// When the payload becomes ready again (unix millis).
        until: u64,
    },
    /// Out of retries; inert until reset or removed.
    TerminallyFailed,
}

/// Result of recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The payload will be retried once the backoff expires.
    Scheduled {
        /// Retry count after this failure.
        retry_count: u32,
        /// When the payload becomes ready again (unix millis).
        next_retry_at: u64,
    },
    /// The payload ran out of retries.
    Exhausted,
}

/// One unit of pending synchronization work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    /// Unique id.
    pub id: PayloadId,
    /// Task kind.
    pub sync_type: SyncType,
    /// Task content.
    pub data: SyncData,
    /// 1 (highest) to 5 (lowest).
    pub priority: u8,
    /// Failed attempts so far.
    pub retry_count: u32,
    /// Attempts allowed before the payload is terminally failed.
    pub max_retries: u32,
    /// Enqueue time (unix millis).
    pub created_at: u64,
    /// Time of the last failed attempt (unix millis).
    pub last_attempt: Option<u64>,
    /// Earliest time of the next attempt (unix millis).
    pub next_retry_at: Option<u64>,
    /// Last failure message.
    pub error: Option<String>,
}

impl SyncPayload {
    /// Builds a fresh payload from a draft.
    pub fn from_draft(draft: PayloadDraft, created_at: u64) -> Self {
        Self {
            id: PayloadId::new(),
            sync_type: draft.data.sync_type(),
            data: draft.data,
            priority: clamp_priority(draft.priority),
            retry_count: 0,
            max_retries: draft.max_retries,
            created_at,
            last_attempt: None,
            next_retry_at: None,
            error: None,
        }
    }

    /// Returns true if the payload has used up its retries.
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Returns true if the payload may be processed at `now`.
    pub fn is_ready_at(&self, now: u64) -> bool {
        matches!(self.state_at(now), PayloadState::Ready)
    }

    /// Returns the lifecycle state at `now`.
    pub fn state_at(&self, now: u64) -> PayloadState {
        if self.is_exhausted() {
            return PayloadState::TerminallyFailed;
        }
        match self.next_retry_at {
            Some(until) if until > now => PayloadState::BackingOff { until },
            _ => PayloadState::Ready,
        }
    }

    /// Clears all retry bookkeeping.
    pub(crate) fn reset_retries(&mut self) {
        self.retry_count = 0;
        self.last_attempt = None;
        self.next_retry_at = None;
        self.error = None;
    }
}
