//! Engine state machine, drain reports and status snapshots.

use crate::error::EngineError;
use offsync_queue::{PayloadId, QueueStats, SyncPayload, SyncType};
use serde::Serialize;

/// Execution state of the coordinator.
///
/// ```text
///            begin                 finish
///   Idle ─────────────▶ Processing ──────────▶ Idle
///    │  ▲                   │ pause              ▲
///    │  │ resume            ▼                    │
///    │  └──── Paused ◀── Processing{pause_requested} (finish)
///    └──pause──▶ Paused
/// ```
///
/// Pausing while a drain runs does not interrupt the upload in flight; the
/// drain stops before its next item and the engine lands in `Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Nothing running; drains may start.
    #[default]
    Idle,
    /// A drain is running.
    Processing {
        /// A pause arrived while draining.
        pause_requested: bool,
    },
    /// Automatic and manual drains are suspended.
    Paused,
}

impl EngineState {
    /// Returns true if a drain is running.
    pub fn is_processing(&self) -> bool {
        matches!(self, EngineState::Processing { .. })
    }

    /// Returns true if paused, or pausing once the current drain stops.
    pub fn is_paused(&self) -> bool {
        matches!(
            self,
            EngineState::Paused
                | EngineState::Processing {
                    pause_requested: true
                }
        )
    }

    /// Returns true if the running drain should stop before its next item.
    pub fn pause_requested(&self) -> bool {
        matches!(
            self,
            EngineState::Processing {
                pause_requested: true
            }
        )
    }

    /// Claims the single drain slot.
    pub(crate) fn begin(&mut self) -> Result<(), SkipReason> {
        match self {
            EngineState::Idle => {
                *self = EngineState::Processing {
                    pause_requested: false,
                };
                Ok(())
            }
            EngineState::Processing { .. } => Err(SkipReason::AlreadyProcessing),
            EngineState::Paused => Err(SkipReason::Paused),
        }
    }

    /// Releases the drain slot.
    pub(crate) fn finish(&mut self) {
        if let EngineState::Processing { pause_requested } = *self {
            *self = if pause_requested {
                EngineState::Paused
            } else {
                EngineState::Idle
            };
        }
    }

    pub(crate) fn pause(&mut self) {
        *self = match *self {
            EngineState::Idle | EngineState::Paused => EngineState::Paused,
            EngineState::Processing { .. } => EngineState::Processing {
                pause_requested: true,
            },
        };
    }

    /// Returns true if the engine left `Paused`.
    pub(crate) fn resume(&mut self) -> bool {
        match *self {
            EngineState::Paused => {
                *self = EngineState::Idle;
                true
            }
            EngineState::Processing { .. } => {
                *self = EngineState::Processing {
                    pause_requested: false,
                };
                false
            }
            EngineState::Idle => false,
        }
    }
}

/// Why a drain did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Another drain holds the slot.
    AlreadyProcessing,
    /// The engine is offline.
    Offline,
    /// Sync is paused.
    Paused,
}

/// How a single payload failed during a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No strategy for its kind; the payload was dropped.
    StrategyMissing,
    /// Retryable failure; a retry is scheduled.
    Transient,
    /// Retryable failure that used up the last retry.
    Exhausted,
    /// Non-retryable failure; the payload is terminally failed.
    Rejected,
}

/// One failed payload in a drain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Payload id.
    pub payload_id: PayloadId,
    /// Task kind.
    pub sync_type: SyncType,
    /// Failure class.
    pub kind: FailureKind,
    /// Failure message.
    pub message: String,
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Payloads uploaded and removed.
    pub processed_count: usize,
    /// Payloads that failed.
    pub failed_count: usize,
    /// Details of each failure.
    pub errors: Vec<ItemFailure>,
    /// Set when the drain did not run at all.
    pub skipped: Option<SkipReason>,
}

impl SyncReport {
    /// A report for a drain that did not run.
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Default::default()
        }
    }

    /// Returns true if the drain did not run.
    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    pub(crate) fn record_failure(
        &mut self,
        payload: &SyncPayload,
        kind: FailureKind,
        message: impl Into<String>,
    ) {
        self.failed_count += 1;
        self.errors.push(ItemFailure {
            payload_id: payload.id,
            sync_type: payload.sync_type,
            kind,
            message: message.into(),
        });
    }
}

/// Process-local view of the engine, rebuilt on each call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalSyncStatus {
    /// Last known connectivity.
    pub is_online: bool,
    /// A drain is running.
    pub is_processing: bool,
    /// Sync is paused or pausing.
    pub is_paused: bool,
    /// End of the last drain (unix millis).
    pub last_sync_time: Option<u64>,
    /// Kind of the payload being uploaded right now.
    pub active_strategy_type: Option<SyncType>,
    /// Kinds with a registered strategy.
    pub registered_types: Vec<SyncType>,
    /// Payloads uploaded since startup.
    pub total_processed: u64,
    /// Failed attempts since startup.
    pub total_failed: u64,
    /// Queue statistics.
    pub queue: QueueStats,
}

/// Everything needed to debug a stuck queue.
#[derive(Debug, Clone, Serialize)]
pub struct SyncDiagnostics {
    /// When the diagnostics were taken (unix millis).
    pub exported_at: u64,
    /// Engine status at that time.
    pub status: GlobalSyncStatus,
    /// Queue contents in order.
    pub items: Vec<SyncPayload>,
}

impl SyncDiagnostics {
    /// Renders the diagnostics as pretty JSON.
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Serialization(e.to_string()))
    }
}
