//! Derived queue statistics.

use crate::payload::{PayloadState, SyncPayload};
use crate::task::SyncType;
use serde::Serialize;
use std::collections::BTreeMap;

/// Snapshot of the queue contents, recomputed on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueStats {
    /// Number of payloads in the queue.
    pub total: usize,
    /// Payloads eligible for processing now.
    pub ready: usize,
    /// Payloads waiting for a backoff to expire.
    pub backing_off: usize,
    /// Payloads that ran out of retries.
    pub failed_items: usize,
    /// Payload count per task kind.
    pub by_type: BTreeMap<SyncType, usize>,
    /// Payload count per priority.
    pub by_priority: BTreeMap<u8, usize>,
    /// Mean retry count over all payloads (0 when empty).
    pub average_retry_count: f64,
    /// Enqueue time of the oldest payload.
    pub oldest_created_at: Option<u64>,
}

impl QueueStats {
    /// Computes statistics over `items` as of `now`.
    pub fn compute(items: &[SyncPayload], now: u64) -> Self {
        let mut stats = QueueStats {
            total: items.len(),
            ..Default::default()
        };
        let mut retries: u64 = 0;

        for item in items {
            match item.state_at(now) {
                PayloadState::Ready => stats.ready += 1,
                PayloadState::BackingOff { .. } => stats.backing_off += 1,
                PayloadState::TerminallyFailed => stats.failed_items += 1,
            }
            *stats.by_type.entry(item.sync_type).or_default() += 1;
            *stats.by_priority.entry(item.priority).or_default() += 1;
            retries += u64::from(item.retry_count);
            stats.oldest_created_at = Some(
                stats
                    .oldest_created_at
                    .map_or(item.created_at, |t| t.min(item.created_at)),
            );
        }

        if !items.is_empty() {
            stats.average_retry_count = retries as f64 / items.len() as f64;
        }
        stats
    }

    /// Count of payloads of one kind.
    pub fn count_of(&self, sync_type: SyncType) -> usize {
        self.by_type.get(&sync_type).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadDraft;
    use crate::task::MenuRefresh;

    fn item(priority: u8, retry_count: u32, created_at: u64) -> SyncPayload {
        let mut p = SyncPayload::from_draft(
            PayloadDraft::new(
                MenuRefresh {
                    venue_id: "v".into(),
                    date: "2026-01-01".into(),
                },
                priority,
                3,
            ),
            created_at,
        );
        p.retry_count = retry_count;
        p
    }

    #[test]
    fn empty_stats() {
        let stats = QueueStats::compute(&[], 0);
        assert_eq!(stats, QueueStats::default());
        assert_eq!(stats.count_of(SyncType::Menu), 0);
    }

    #[test]
    fn counts_states_and_averages() {
        let mut waiting = item(2, 1, 20);
        waiting.next_retry_at = Some(1_000);
        let items = vec![item(1, 0, 30), waiting, item(2, 3, 10)];

        let stats = QueueStats::compute(&items, 500);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.ready, 1);
        assert_eq!(stats.backing_off, 1);
        assert_eq!(stats.failed_items, 1);
        assert_eq!(stats.count_of(SyncType::Menu), 3);
        assert_eq!(stats.by_priority.get(&2), Some(&2));
        assert!((stats.average_retry_count - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.oldest_created_at, Some(10));
    }
}
