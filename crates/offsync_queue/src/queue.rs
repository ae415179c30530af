//! The persistent, priority-ordered retry queue.

use crate::clock::{Clock, SystemClock};
use crate::codec;
use crate::config::{QueueConfig, WritePolicy};
use crate::error::{QueueError, QueueResult};
use crate::payload::{PayloadDraft, PayloadId, RetryOutcome, SyncPayload};
use crate::stats::QueueStats;
use crate::task::{SyncData, SyncType};
use offsync_storage::DurableStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Durable storage and retry-aware retrieval of [`SyncPayload`]s.
///
/// # Ordering
///
/// Payloads are kept sorted by `(priority, created_at)`. The sort is
/// stable, so payloads enqueued in the same millisecond keep their
/// insertion order.
///
/// # Durability
///
/// Every mutating call writes the whole collection to the store before it
/// returns. What happens when that write fails depends on
/// [`QueueConfig::write_policy`].
///
/// # Example
///
/// ```rust
/// use offsync_queue::{MenuRefresh, PersistentQueue, QueueConfig};
/// use offsync_storage::InMemoryStore;
///
/// let mut queue = PersistentQueue::open(InMemoryStore::new(), QueueConfig::default()).unwrap();
/// let id = queue
///     .add(MenuRefresh { venue_id: "north".into(), date: "2026-03-01".into() }.into(), 4, 2)
///     .unwrap();
/// assert_eq!(queue.get_next().unwrap().id, id);
/// ```
#[derive(Debug)]
pub struct PersistentQueue<S: DurableStore> {
    store: S,
    config: QueueConfig,
    clock: Arc<dyn Clock>,
    items: Vec<SyncPayload>,
}

impl<S: DurableStore> PersistentQueue<S> {
    /// Opens the queue stored in `store`, using the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored snapshot cannot be read or decoded.
    pub fn open(store: S, config: QueueConfig) -> QueueResult<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Opens the queue stored in `store` with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored snapshot cannot be read or decoded.
    pub fn with_clock(store: S, config: QueueConfig, clock: Arc<dyn Clock>) -> QueueResult<Self> {
        let mut queue = Self {
            store,
            config,
            clock,
            items: Vec::new(),
        };
        queue.reload()?;
        Ok(queue)
    }

    /// Re-reads the durable snapshot, discarding the in-memory view.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or decoded.
    pub fn reload(&mut self) -> QueueResult<()> {
        let items = match self.store.get(&self.config.storage_key)? {
            Some(bytes) => codec::decode_snapshot(&bytes)?,
            None => Vec::new(),
        };
        self.items = items;
        self.sort();
        debug!(count = self.items.len(), "queue loaded");
        Ok(())
    }

    /// Returns the queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the clock used for retry scheduling.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Enqueues `data` and returns its new id.
    ///
    /// The priority is clamped to 1..=5.
    ///
    /// # Errors
    ///
    /// Under [`WritePolicy::Strict`], returns the storage error and leaves
    /// the queue unchanged if the write fails.
    pub fn add(&mut self, data: SyncData, priority: u8, max_retries: u32) -> QueueResult<PayloadId> {
        self.enqueue(PayloadDraft {
            data,
            priority,
            max_retries,
        })
    }

    /// Enqueues `data` with priority 3 and the configured default retries.
    ///
    /// # Errors
    ///
    /// See [`PersistentQueue::add`].
    pub fn add_default(&mut self, data: SyncData) -> QueueResult<PayloadId> {
        let max_retries = self.config.default_max_retries;
        self.add(data, 3, max_retries)
    }

    /// Enqueues a prepared draft and returns its new id.
    ///
    /// # Errors
    ///
    /// See [`PersistentQueue::add`].
    pub fn enqueue(&mut self, draft: PayloadDraft) -> QueueResult<PayloadId> {
        let checkpoint = self.checkpoint();
        let payload = SyncPayload::from_draft(draft, self.now());
        let id = payload.id;
        let sync_type = payload.sync_type;
        let priority = payload.priority;

        self.items.push(payload);
        self.sort();
        self.commit(checkpoint)?;

        debug!(%id, %sync_type, priority, "payload enqueued");
        Ok(id)
    }

    /// Returns the payloads eligible for processing now, in queue order.
    ///
    /// Excludes terminally failed payloads and payloads whose backoff has
    /// not expired.
    pub fn get_ready(&self) -> Vec<SyncPayload> {
        let now = self.now();
        self.items
            .iter()
            .filter(|item| item.is_ready_at(now))
            .cloned()
            .collect()
    }

    /// Returns the first ready payload.
    pub fn get_next(&self) -> Option<SyncPayload> {
        let now = self.now();
        self.items.iter().find(|item| item.is_ready_at(now)).cloned()
    }

    /// Returns up to `n` ready payloads, in queue order.
    pub fn get_batch(&self, n: usize) -> Vec<SyncPayload> {
        let now = self.now();
        self.items
            .iter()
            .filter(|item| item.is_ready_at(now))
            .take(n)
            .cloned()
            .collect()
    }

    /// Returns every payload of `sync_type` that still has retries left,
    /// whether or not its backoff has expired.
    pub fn live_of_type(&self, sync_type: SyncType) -> Vec<SyncPayload> {
        self.items
            .iter()
            .filter(|item| item.sync_type == sync_type && !item.is_exhausted())
            .cloned()
            .collect()
    }

    /// Looks up a payload by id.
    pub fn get(&self, id: &PayloadId) -> Option<&SyncPayload> {
        self.items.iter().find(|item| item.id == *id)
    }

    /// Returns all payloads in queue order.
    pub fn items(&self) -> &[SyncPayload] {
        &self.items
    }

    /// Records a failed attempt and schedules the next one.
    ///
    /// Returns `None` if no payload has this id.
    ///
    /// # Errors
    ///
    /// Under [`WritePolicy::Strict`], returns the storage error and leaves
    /// the payload unchanged if the write fails.
    pub fn mark_failed(
        &mut self,
        id: &PayloadId,
        error: impl Into<String>,
    ) -> QueueResult<Option<RetryOutcome>> {
        let now = self.now();
        let checkpoint = self.checkpoint();
        let Some(item) = self.items.iter_mut().find(|item| item.id == *id) else {
            return Ok(None);
        };

        item.retry_count = (item.retry_count + 1).min(item.max_retries);
        item.last_attempt = Some(now);
        item.error = Some(error.into());

        let outcome = if item.retry_count < item.max_retries {
            let delay = self.config.backoff.delay_for_retry(item.retry_count);
            let next_retry_at = now + delay.as_millis() as u64;
            item.next_retry_at = Some(next_retry_at);
            RetryOutcome::Scheduled {
                retry_count: item.retry_count,
                next_retry_at,
            }
        } else {
            item.next_retry_at = None;
            RetryOutcome::Exhausted
        };

        match outcome {
            RetryOutcome::Scheduled {
                retry_count,
                next_retry_at,
            } => debug!(%id, retry_count, next_retry_at, "retry scheduled"),
            RetryOutcome::Exhausted => warn!(%id, "payload out of retries"),
        }

        self.commit(checkpoint)?;
        Ok(Some(outcome))
    }

    /// Records a failure that must not be retried.
    ///
    /// The payload becomes terminally failed immediately. Returns false if
    /// no payload has this id.
    ///
    /// # Errors
    ///
    /// See [`PersistentQueue::mark_failed`].
    pub fn mark_exhausted(&mut self, id: &PayloadId, error: impl Into<String>) -> QueueResult<bool> {
        let now = self.now();
        let checkpoint = self.checkpoint();
        let Some(item) = self.items.iter_mut().find(|item| item.id == *id) else {
            return Ok(false);
        };

        item.retry_count = item.max_retries;
        item.last_attempt = Some(now);
        item.next_retry_at = None;
        item.error = Some(error.into());
        warn!(%id, "payload failed permanently");

        self.commit(checkpoint)?;
        Ok(true)
    }

    /// Removes a payload. Returns false if no payload has this id.
    ///
    /// # Errors
    ///
    /// Under [`WritePolicy::Strict`], returns the storage error and keeps
    /// the payload if the write fails.
    pub fn remove(&mut self, id: &PayloadId) -> QueueResult<bool> {
        let checkpoint = self.checkpoint();
        let before = self.items.len();
        self.items.retain(|item| item.id != *id);
        if self.items.len() == before {
            return Ok(false);
        }
        self.commit(checkpoint)?;
        Ok(true)
    }

    /// Removes every payload.
    ///
    /// # Errors
    ///
    /// See [`PersistentQueue::remove`].
    pub fn clear(&mut self) -> QueueResult<()> {
        let checkpoint = self.checkpoint();
        let removed = self.items.len();
        self.items.clear();
        self.commit(checkpoint)?;
        info!(removed, "queue cleared");
        Ok(())
    }

    /// Removes every payload of one kind and returns how many were removed.
    ///
    /// # Errors
    ///
    /// See [`PersistentQueue::remove`].
    pub fn clear_by_type(&mut self, sync_type: SyncType) -> QueueResult<usize> {
        self.remove_where(|item| item.sync_type == sync_type)
    }

    /// Removes every terminally failed payload and returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// See [`PersistentQueue::remove`].
    pub fn remove_failed(&mut self) -> QueueResult<usize> {
        self.remove_where(SyncPayload::is_exhausted)
    }

    /// Clears retry bookkeeping so the payload becomes ready again.
    ///
    /// Returns false if no payload has this id.
    ///
    /// # Errors
    ///
    /// See [`PersistentQueue::mark_failed`].
    pub fn reset_retries(&mut self, id: &PayloadId) -> QueueResult<bool> {
        let checkpoint = self.checkpoint();
        let Some(item) = self.items.iter_mut().find(|item| item.id == *id) else {
            return Ok(false);
        };
        item.reset_retries();
        self.commit(checkpoint)?;
        debug!(%id, "retries reset");
        Ok(true)
    }

    /// Computes statistics over the current contents.
    pub fn stats(&self) -> QueueStats {
        QueueStats::compute(&self.items, self.now())
    }

    /// Number of payloads, including terminally failed ones.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the queue holds no payloads.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of payloads of one kind that still have retries left.
    pub fn pending_count(&self, sync_type: SyncType) -> usize {
        self.items
            .iter()
            .filter(|item| item.sync_type == sync_type && !item.is_exhausted())
            .count()
    }

    /// Serializes the whole queue as JSON.
    ///
    /// # Errors
    ///
    /// Returns a codec error if serialization fails.
    pub fn export(&self) -> QueueResult<String> {
        codec::export_json(&self.items)
    }

    /// Replaces the queue contents with a JSON export.
    ///
    /// Returns the number of payloads imported. Payloads whose declared
    /// type disagrees with their data are dropped.
    ///
    /// # Errors
    ///
    /// Returns a codec error for malformed input; under
    /// [`WritePolicy::Strict`] also returns write failures.
    pub fn import(&mut self, json: &str) -> QueueResult<usize> {
        let items = codec::import_json(json)?;
        let checkpoint = self.checkpoint();
        self.items = items;
        self.sort();
        self.commit(checkpoint)?;
        info!(count = self.items.len(), "queue imported");
        Ok(self.items.len())
    }

    fn remove_where(&mut self, predicate: impl Fn(&SyncPayload) -> bool) -> QueueResult<usize> {
        let checkpoint = self.checkpoint();
        let before = self.items.len();
        self.items.retain(|item| !predicate(item));
        let removed = before - self.items.len();
        if removed > 0 {
            self.commit(checkpoint)?;
        }
        Ok(removed)
    }

    fn now(&self) -> u64 {
        self.clock.now_millis()
    }

    fn sort(&mut self) {
        self.items.sort_by_key(|item| (item.priority, item.created_at));
    }

    /// Captures the state to restore if a strict write fails.
    fn checkpoint(&self) -> Option<Vec<SyncPayload>> {
        match self.config.write_policy {
            WritePolicy::Strict => Some(self.items.clone()),
            WritePolicy::BestEffort => None,
        }
    }

    /// Persists the current contents, applying the write policy on failure.
    fn commit(&mut self, checkpoint: Option<Vec<SyncPayload>>) -> QueueResult<()> {
        let result = codec::encode_snapshot(&self.items).and_then(|bytes| {
            self.store
                .set(&self.config.storage_key, &bytes)
                .map_err(QueueError::from)
        });

        let Err(err) = result else {
            return Ok(());
        };

        match checkpoint {
            Some(previous) => {
                warn!(error = %err, "queue write failed, rolling back");
                self.items = previous;
                Err(err)
            }
            None => {
                warn!(error = %err, "queue write failed, keeping in-memory state");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::payload::PayloadState;
    use crate::task::{MenuRefresh, PhotoAnalysis};
    use offsync_storage::InMemoryStore;
    use std::time::Duration;

    fn menu(venue: &str) -> SyncData {
        MenuRefresh {
            venue_id: venue.into(),
            date: "2026-03-01".into(),
        }
        .into()
    }

    fn photo(id: &str) -> SyncData {
        PhotoAnalysis {
            local_id: id.into(),
            user_id: "u1".into(),
            image_path: format!("/photos/{id}.jpg"),
            mime_type: "image/jpeg".into(),
            byte_len: 2048,
            meal_local_id: None,
        }
        .into()
    }

    fn queue_with(
        policy: WritePolicy,
    ) -> (
        PersistentQueue<Arc<InMemoryStore>>,
        Arc<InMemoryStore>,
        ManualClock,
    ) {
        let store = Arc::new(InMemoryStore::new());
        let clock = ManualClock::new(1_000_000);
        let queue = PersistentQueue::with_clock(
            Arc::clone(&store),
            QueueConfig::default().with_write_policy(policy),
            Arc::new(clock.clone()),
        )
        .unwrap();
        (queue, store, clock)
    }

    fn queue() -> (
        PersistentQueue<Arc<InMemoryStore>>,
        Arc<InMemoryStore>,
        ManualClock,
    ) {
        queue_with(WritePolicy::BestEffort)
    }

    #[test]
    fn add_persists_before_returning() {
        let (mut queue, store, _clock) = queue();
        let id = queue.add(menu("a"), 3, 2).unwrap();

        let bytes = store.get("sync_queue").unwrap().unwrap();
        let stored = codec::decode_snapshot(&bytes).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
    }

    #[test]
    fn ready_items_follow_priority_then_fifo() {
        let (mut queue, _store, clock) = queue();
        let p3 = queue.add(menu("three"), 3, 2).unwrap();
        clock.advance(Duration::from_millis(1));
        let p1 = queue.add(menu("one"), 1, 2).unwrap();
        clock.advance(Duration::from_millis(1));
        let p2 = queue.add(menu("two"), 2, 2).unwrap();
        clock.advance(Duration::from_millis(1));
        let p1_later = queue.add(menu("one-later"), 1, 2).unwrap();

        let order: Vec<PayloadId> = queue.get_ready().iter().map(|p| p.id).collect();
        assert_eq!(order, vec![p1, p1_later, p2, p3]);
        assert_eq!(queue.get_next().unwrap().id, p1);
    }

    #[test]
    fn same_millisecond_keeps_insertion_order() {
        let (mut queue, _store, _clock) = queue();
        let first = queue.add(menu("a"), 2, 2).unwrap();
        let second = queue.add(menu("b"), 2, 2).unwrap();
        let ids: Vec<PayloadId> = queue.items().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn priority_is_clamped_on_add() {
        let (mut queue, _store, _clock) = queue();
        let id = queue.add(menu("a"), 0, 2).unwrap();
        assert_eq!(queue.get(&id).unwrap().priority, 1);
        let id = queue.add(menu("b"), 42, 2).unwrap();
        assert_eq!(queue.get(&id).unwrap().priority, 5);
    }

    #[test]
    fn mark_failed_follows_backoff_schedule() {
        let (mut queue, _store, clock) = queue();
        let id = queue.add(photo("p1"), 3, 10).unwrap();

        let expected = [1u64, 5, 15, 60, 60, 60];
        for (attempt, secs) in expected.iter().enumerate() {
            let now = clock.now_millis();
            let outcome = queue.mark_failed(&id, "timeout").unwrap().unwrap();
            assert_eq!(
                outcome,
                RetryOutcome::Scheduled {
                    retry_count: attempt as u32 + 1,
                    next_retry_at: now + secs * 1000,
                }
            );
            let item = queue.get(&id).unwrap();
            assert_eq!(item.last_attempt, Some(now));
            assert!(item.next_retry_at.unwrap() >= now);
            clock.advance(Duration::from_secs(*secs));
        }
    }

    #[test]
    fn backoff_gates_ready_list() {
        let (mut queue, _store, clock) = queue();
        let id = queue.add(menu("a"), 3, 3).unwrap();
        queue.mark_failed(&id, "offline").unwrap();

        assert!(queue.get_ready().is_empty());
        assert!(queue.get_next().is_none());

        clock.advance(Duration::from_millis(999));
        assert!(queue.get_ready().is_empty());
        clock.advance(Duration::from_millis(1));
        assert_eq!(queue.get_ready().len(), 1);
    }

    #[test]
    fn exhausted_payload_leaves_ready_list() {
        let (mut queue, _store, clock) = queue();
        let id = queue.add(photo("p1"), 3, 3).unwrap();

        for _ in 0..2 {
            queue.mark_failed(&id, "boom").unwrap();
            clock.advance(Duration::from_secs(120));
        }
        assert_eq!(
            queue.mark_failed(&id, "boom").unwrap(),
            Some(RetryOutcome::Exhausted)
        );

        let item = queue.get(&id).unwrap();
        assert_eq!(item.retry_count, 3);
        assert!(item.next_retry_at.is_none());
        assert_eq!(
            item.state_at(clock.now_millis()),
            PayloadState::TerminallyFailed
        );

        clock.advance(Duration::from_secs(3600));
        assert!(queue.get_ready().is_empty());
        assert_eq!(queue.stats().failed_items, 1);

        assert_eq!(queue.remove_failed().unwrap(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn mark_failed_unknown_id() {
        let (mut queue, _store, _clock) = queue();
        assert_eq!(queue.mark_failed(&PayloadId::new(), "x").unwrap(), None);
        assert!(!queue.mark_exhausted(&PayloadId::new(), "x").unwrap());
        assert!(!queue.remove(&PayloadId::new()).unwrap());
        assert!(!queue.reset_retries(&PayloadId::new()).unwrap());
    }

    #[test]
    fn mark_exhausted_is_terminal() {
        let (mut queue, _store, _clock) = queue();
        let id = queue.add(menu("a"), 3, 5).unwrap();
        assert!(queue.mark_exhausted(&id, "bad request").unwrap());

        let item = queue.get(&id).unwrap();
        assert!(item.is_exhausted());
        assert_eq!(item.error.as_deref(), Some("bad request"));
        assert!(queue.get_ready().is_empty());
    }

    #[test]
    fn reset_retries_makes_payload_ready() {
        let (mut queue, _store, _clock) = queue();
        let id = queue.add(menu("a"), 3, 1).unwrap();
        queue.mark_failed(&id, "boom").unwrap();
        assert!(queue.get_ready().is_empty());

        assert!(queue.reset_retries(&id).unwrap());
        let item = queue.get(&id).unwrap();
        assert_eq!(item.retry_count, 0);
        assert!(item.error.is_none());
        assert!(item.next_retry_at.is_none());
        assert_eq!(queue.get_ready().len(), 1);
    }

    #[test]
    fn batch_and_type_queries() {
        let (mut queue, _store, _clock) = queue();
        queue.add(menu("a"), 1, 2).unwrap();
        let waiting = queue.add(photo("p1"), 2, 2).unwrap();
        queue.add(menu("b"), 3, 2).unwrap();
        queue.mark_failed(&waiting, "later").unwrap();

        assert_eq!(queue.get_batch(1).len(), 1);
        assert_eq!(queue.get_batch(10).len(), 2);
        assert_eq!(queue.live_of_type(SyncType::Photo).len(), 1);
        assert_eq!(queue.pending_count(SyncType::Menu), 2);
        assert_eq!(queue.pending_count(SyncType::Meal), 0);
    }

    #[test]
    fn clear_and_clear_by_type() {
        let (mut queue, store, _clock) = queue();
        queue.add(menu("a"), 1, 2).unwrap();
        queue.add(photo("p1"), 2, 2).unwrap();
        queue.add(photo("p2"), 2, 2).unwrap();

        assert_eq!(queue.clear_by_type(SyncType::Photo).unwrap(), 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.clear_by_type(SyncType::Photo).unwrap(), 0);

        queue.clear().unwrap();
        assert!(queue.is_empty());

        let stored = codec::decode_snapshot(&store.get("sync_queue").unwrap().unwrap()).unwrap();
        assert!(stored.is_empty());
    }

    #[test]
    fn reopen_restores_contents() {
        let (mut queue, store, clock) = queue();
        queue.add(menu("a"), 4, 2).unwrap();
        let failing = queue.add(photo("p1"), 1, 3).unwrap();
        queue.mark_failed(&failing, "boom").unwrap();
        let before = queue.items().to_vec();
        drop(queue);

        let reopened = PersistentQueue::with_clock(
            Arc::clone(&store),
            QueueConfig::default(),
            Arc::new(clock),
        )
        .unwrap();
        assert_eq!(reopened.items(), before.as_slice());
    }

    #[test]
    fn export_import_round_trip() {
        let (mut queue, _store, _clock) = queue();
        queue.add(menu("a"), 2, 2).unwrap();
        queue.add(photo("p1"), 1, 3).unwrap();
        let json = queue.export().unwrap();
        let before = queue.items().to_vec();

        let (mut other, _other_store, _clock) = self::queue();
        assert_eq!(other.import(&json).unwrap(), 2);
        assert_eq!(other.items(), before.as_slice());
    }

    #[test]
    fn best_effort_keeps_mutation_on_write_failure() {
        let (mut queue, store, _clock) = queue_with(WritePolicy::BestEffort);
        queue.add(menu("a"), 1, 2).unwrap();

        store.set_fail_writes(true);
        queue.add(menu("b"), 1, 2).unwrap();
        assert_eq!(queue.len(), 2);

        let stored = codec::decode_snapshot(&store.get("sync_queue").unwrap().unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn strict_rolls_back_on_write_failure() {
        let (mut queue, store, _clock) = queue_with(WritePolicy::Strict);
        let id = queue.add(menu("a"), 1, 3).unwrap();

        store.set_fail_writes(true);
        assert!(queue.add(menu("b"), 1, 2).unwrap_err().is_storage());
        assert_eq!(queue.len(), 1);

        assert!(queue.mark_failed(&id, "boom").is_err());
        assert_eq!(queue.get(&id).unwrap().retry_count, 0);

        assert!(queue.remove(&id).is_err());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn zero_retry_budget_is_never_ready() {
        let (mut queue, _store, _clock) = queue();
        queue.add(menu("a"), 1, 0).unwrap();
        assert!(queue.get_ready().is_empty());
        assert_eq!(queue.stats().failed_items, 1);
    }
}
