//! The sync coordinator.

use crate::config::EngineConfig;
use crate::connectivity::ConnectivityListener;
use crate::error::{EngineError, EngineResult};
use crate::state::{
    EngineState, FailureKind, GlobalSyncStatus, SkipReason, SyncDiagnostics, SyncReport,
};
use crate::strategy::{ErasedStrategy, StrategyRegistry, SyncStrategy};
use offsync_queue::{
    Clock, PayloadId, PersistentQueue, QueueResult, RetryOutcome, SyncData, SyncPayload,
    SyncType, SystemClock, TaskData,
};
use offsync_storage::DurableStore;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Which payloads a drain takes.
#[derive(Debug, Clone, Copy)]
enum DrainScope {
    Ready,
    Batch(usize),
    ForceType(SyncType),
}

#[derive(Debug, Default)]
struct Activity {
    last_sync_time: Option<u64>,
    active_type: Option<SyncType>,
    total_processed: u64,
    total_failed: u64,
}

struct Inner<S: DurableStore> {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    queue: Mutex<PersistentQueue<S>>,
    strategies: RwLock<StrategyRegistry>,
    state: Mutex<EngineState>,
    online: AtomicBool,
    activity: Mutex<Activity>,
}

/// Releases the drain slot when a drain ends, however it ends.
struct DrainGuard<'a, S: DurableStore> {
    inner: &'a Inner<S>,
}

impl<S: DurableStore> Drop for DrainGuard<'_, S> {
    fn drop(&mut self) {
        self.inner.activity.lock().active_type = None;
        self.inner.state.lock().finish();
    }
}

/// Drives queued payloads through their strategies.
///
/// The coordinator owns the [`PersistentQueue`] and the strategy table.
/// Producers call [`SyncCoordinator::sync`]; the coordinator persists the
/// payload and uploads it when connectivity allows.
///
/// # Single-flight
///
/// At most one drain runs at a time, and a drain uploads one payload at a
/// time. A drain requested while another runs returns immediately with
/// [`SkipReason::AlreadyProcessing`].
///
/// # Example
///
/// ```rust,no_run
/// use offsync_engine::{EngineConfig, SyncCoordinator};
/// use offsync_storage::InMemoryStore;
///
/// # async fn run() -> offsync_engine::EngineResult<()> {
/// let coordinator = SyncCoordinator::new(InMemoryStore::new(), EngineConfig::default())?;
/// coordinator.set_online(true);
/// let report = coordinator.process_queue().await;
/// assert_eq!(report.processed_count, 0);
/// # Ok(())
/// # }
/// ```
pub struct SyncCoordinator<S: DurableStore + 'static> {
    inner: Arc<Inner<S>>,
}

impl<S: DurableStore + 'static> Clone for SyncCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DurableStore + 'static> std::fmt::Debug for SyncCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("online", &self.is_online())
            .field("state", &*self.inner.state.lock())
            .field("strategies", &self.registered_types())
            .finish()
    }
}

impl<S: DurableStore + 'static> SyncCoordinator<S> {
    /// Opens the queue in `store` and creates a coordinator around it.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored queue cannot be loaded.
    pub fn new(store: S, config: EngineConfig) -> EngineResult<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Creates a coordinator with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored queue cannot be loaded.
    pub fn with_clock(store: S, config: EngineConfig, clock: Arc<dyn Clock>) -> EngineResult<Self> {
        let queue = PersistentQueue::with_clock(store, config.queue.clone(), Arc::clone(&clock))?;
        info!(
            pending = queue.len(),
            online = config.start_online,
            "sync coordinator ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                online: AtomicBool::new(config.start_online),
                config,
                clock,
                queue: Mutex::new(queue),
                strategies: RwLock::new(StrategyRegistry::default()),
                state: Mutex::new(EngineState::Idle),
                activity: Mutex::new(Activity::default()),
            }),
        })
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // =========================================================================
    // Strategies
    // =========================================================================

    /// Registers a strategy under its data's task kind.
    ///
    /// Returns true if it replaced a previously registered strategy.
    pub fn register_strategy<St: SyncStrategy>(&self, strategy: St) -> bool {
        let sync_type = St::Data::SYNC_TYPE;
        let replaced = self.inner.strategies.write().register(strategy);
        if replaced {
            warn!(%sync_type, "strategy replaced");
        } else {
            info!(%sync_type, "strategy registered");
        }
        replaced
    }

    /// Removes the strategy for a task kind.
    ///
    /// Payloads of that kind left in the queue are dropped by the next
    /// drain that reaches them.
    pub fn unregister_strategy(&self, sync_type: SyncType) -> bool {
        let removed = self.inner.strategies.write().unregister(sync_type);
        if removed {
            info!(%sync_type, "strategy unregistered");
        }
        removed
    }

    /// Task kinds with a registered strategy, in declaration order.
    pub fn registered_types(&self) -> Vec<SyncType> {
        self.inner.strategies.read().types()
    }

    fn strategy(&self, sync_type: SyncType) -> Option<Arc<dyn ErasedStrategy>> {
        self.inner.strategies.read().get(sync_type)
    }

    // =========================================================================
    // Producer API
    // =========================================================================

    /// Validates, enqueues and (when online) schedules upload of `data`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::StrategyMissing`] if no strategy handles the kind
    /// - [`EngineError::Validation`] if the strategy rejects the data
    /// - [`EngineError::Queue`] if the payload could not be stored
    pub fn sync<D: TaskData>(&self, data: D) -> EngineResult<PayloadId> {
        self.sync_data(data.into_sync_data())
    }

    /// Untyped form of [`SyncCoordinator::sync`].
    ///
    /// # Errors
    ///
    /// See [`SyncCoordinator::sync`].
    pub fn sync_data(&self, data: SyncData) -> EngineResult<PayloadId> {
        let sync_type = data.sync_type();
        let strategy = self
            .strategy(sync_type)
            .ok_or(EngineError::StrategyMissing(sync_type))?;

        if !strategy.validate(&data) {
            debug!(%sync_type, "data rejected by validation");
            return Err(EngineError::Validation { sync_type });
        }
        let draft = strategy
            .prepare(&data)
            .ok_or(EngineError::Validation { sync_type })?;

        let (id, payload) = {
            let mut queue = self.inner.queue.lock();
            let id = queue.enqueue(draft)?;
            (id, queue.get(&id).cloned())
        };
        if let Some(payload) = payload {
            strategy.enqueued(&payload);
        }
        debug!(%id, %sync_type, "payload enqueued");

        if self.inner.config.drain_on_enqueue {
            self.spawn_drain("enqueue");
        }
        Ok(id)
    }

    // =========================================================================
    // Draining
    // =========================================================================

    /// Uploads every ready payload, one at a time.
    ///
    /// Per-item failures are recorded in the report and in the queue;
    /// they never abort the drain.
    pub async fn process_queue(&self) -> SyncReport {
        self.drain(DrainScope::Ready).await
    }

    /// Same as [`SyncCoordinator::process_queue`].
    pub async fn sync_all(&self) -> SyncReport {
        self.process_queue().await
    }

    /// Uploads at most `n` ready payloads, highest priority first.
    pub async fn sync_batch(&self, n: usize) -> SyncReport {
        self.drain(DrainScope::Batch(n)).await
    }

    /// Periodic drain of [`EngineConfig::background_batch_size`] payloads.
    ///
    /// Meant to be called from a timer owned by the caller.
    pub async fn sync_background_tick(&self) -> SyncReport {
        self.sync_batch(self.inner.config.background_batch_size).await
    }

    /// Uploads every payload of one kind that has retries left, ignoring
    /// backoff.
    pub async fn force_sync_type(&self, sync_type: SyncType) -> SyncReport {
        self.drain(DrainScope::ForceType(sync_type)).await
    }

    async fn drain(&self, scope: DrainScope) -> SyncReport {
        if !self.is_online() {
            debug!(?scope, "offline, drain skipped");
            return SyncReport::skipped(SkipReason::Offline);
        }

        let begun = self.inner.state.lock().begin();
        if let Err(reason) = begun {
            debug!(?scope, ?reason, "drain skipped");
            return SyncReport::skipped(reason);
        }
        let _guard = DrainGuard { inner: &self.inner };

        let batch = {
            let queue = self.inner.queue.lock();
            match scope {
                DrainScope::Ready => queue.get_ready(),
                DrainScope::Batch(n) => queue.get_batch(n),
                DrainScope::ForceType(sync_type) => queue.live_of_type(sync_type),
            }
        };
        if batch.is_empty() {
            debug!(?scope, "nothing to sync");
        } else {
            info!(?scope, count = batch.len(), "drain started");
        }

        let mut report = SyncReport::default();
        for payload in batch {
            let pause_requested = self.inner.state.lock().pause_requested();
            if pause_requested {
                info!("pause requested, drain stopped");
                break;
            }
            if !self.is_online() {
                info!("went offline, drain stopped");
                break;
            }

            let still_queued = self.inner.queue.lock().get(&payload.id).is_some();
            if !still_queued {
                debug!(id = %payload.id, "payload removed during drain, skipped");
                continue;
            }

            self.process_one(payload, &mut report).await;
        }

        {
            let mut activity = self.inner.activity.lock();
            activity.last_sync_time = Some(self.inner.clock.now_millis());
            activity.total_processed += report.processed_count as u64;
            activity.total_failed += report.failed_count as u64;
        }

        if report.processed_count > 0 || report.failed_count > 0 {
            info!(
                processed = report.processed_count,
                failed = report.failed_count,
                "drain finished"
            );
        }
        report
    }

    async fn process_one(&self, payload: SyncPayload, report: &mut SyncReport) {
        let id = payload.id;
        let sync_type = payload.sync_type;

        let Some(strategy) = self.strategy(sync_type) else {
            error!(%id, %sync_type, "no strategy registered, payload dropped");
            self.queue_op(|queue| queue.remove(&id));
            report.record_failure(
                &payload,
                FailureKind::StrategyMissing,
                format!("no strategy registered for {sync_type}"),
            );
            return;
        };

        self.inner.activity.lock().active_type = Some(sync_type);
        let result = strategy.execute(&payload).await;

        match result {
            Ok(()) => {
                self.queue_op(|queue| queue.remove(&id));
                report.processed_count += 1;
                debug!(%id, %sync_type, "payload synced");
            }
            Err(err) if err.is_retryable() => {
                let outcome = self.queue_op(|queue| queue.mark_failed(&id, err.message()));
                let kind = match outcome {
                    Some(Some(RetryOutcome::Exhausted)) => FailureKind::Exhausted,
                    _ => FailureKind::Transient,
                };
                warn!(%id, %sync_type, error = %err, ?kind, "upload failed");
                report.record_failure(&payload, kind, err.message());
            }
            Err(err) => {
                self.queue_op(|queue| queue.mark_exhausted(&id, err.message()));
                warn!(%id, %sync_type, error = %err, "upload rejected");
                report.record_failure(&payload, FailureKind::Rejected, err.message());
            }
        }
    }

    /// Runs a queue mutation inside a drain, where storage errors are
    /// logged rather than returned.
    fn queue_op<T>(
        &self,
        op: impl FnOnce(&mut PersistentQueue<S>) -> QueueResult<T>,
    ) -> Option<T> {
        let result = op(&mut self.inner.queue.lock());
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                error!(error = %err, "queue update failed during drain");
                None
            }
        }
    }

    /// Starts a drain on the current Tokio runtime, if online.
    fn spawn_drain(&self, trigger: &'static str) {
        if !self.is_online() {
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                let coordinator = self.clone();
                handle.spawn(async move {
                    let report = coordinator.process_queue().await;
                    debug!(
                        trigger,
                        processed = report.processed_count,
                        failed = report.failed_count,
                        skipped = ?report.skipped,
                        "background drain done"
                    );
                });
            }
            Err(_) => debug!(trigger, "no async runtime, drain deferred"),
        }
    }

    // =========================================================================
    // Connectivity
    // =========================================================================

    /// Records connectivity. Going from offline to online starts a drain.
    pub fn set_online(&self, online: bool) {
        let was_online = self.inner.online.swap(online, Ordering::SeqCst);
        if was_online == online {
            return;
        }
        info!(online, "connectivity changed");
        if online {
            self.spawn_drain("reconnect");
        }
    }

    /// Returns the last known connectivity.
    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Follows a connectivity feed until the returned listener is stopped
    /// or the feed closes.
    ///
    /// The feed's current value is applied immediately. Must be called
    /// from within a Tokio runtime.
    pub fn listen(&self, mut updates: watch::Receiver<bool>) -> ConnectivityListener {
        let initial = *updates.borrow_and_update();
        self.set_online(initial);

        let coordinator = self.clone();
        let task = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let online = *updates.borrow_and_update();
                coordinator.set_online(online);
            }
            debug!("connectivity feed closed");
        });
        ConnectivityListener::new(task)
    }

    // =========================================================================
    // Pause / resume
    // =========================================================================

    /// Suspends draining.
    ///
    /// An upload already in flight completes; the drain stops before the
    /// next payload.
    pub fn pause_sync(&self) {
        self.inner.state.lock().pause();
        info!("sync paused");
    }

    /// Lifts a pause and, when online, starts a drain.
    pub fn resume_sync(&self) {
        let resumed = self.inner.state.lock().resume();
        info!("sync resumed");
        if resumed {
            self.spawn_drain("resume");
        }
    }

    /// Returns the current engine state.
    pub fn state(&self) -> EngineState {
        *self.inner.state.lock()
    }

    // =========================================================================
    // Status & maintenance
    // =========================================================================

    /// Builds a status snapshot.
    pub fn get_status(&self) -> GlobalSyncStatus {
        let state = self.state();
        let queue = self.inner.queue.lock().stats();
        let registered_types = self.registered_types();
        let activity = self.inner.activity.lock();
        GlobalSyncStatus {
            is_online: self.is_online(),
            is_processing: state.is_processing(),
            is_paused: state.is_paused(),
            last_sync_time: activity.last_sync_time,
            active_strategy_type: activity.active_type,
            registered_types,
            total_processed: activity.total_processed,
            total_failed: activity.total_failed,
            queue,
        }
    }

    /// Payloads of one kind that still have retries left.
    pub fn get_pending_count(&self, sync_type: SyncType) -> usize {
        self.inner.queue.lock().pending_count(sync_type)
    }

    /// All payloads in the queue, terminally failed ones included.
    pub fn pending_count(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Resets a payload's retry state and, when online, starts a drain.
    ///
    /// Returns false if no payload has this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset could not be stored.
    pub fn retry_failed(&self, id: &PayloadId) -> EngineResult<bool> {
        let reset = self.inner.queue.lock().reset_retries(id)?;
        if reset {
            info!(%id, "payload retry requested");
            self.spawn_drain("retry");
        }
        Ok(reset)
    }

    /// Drops every terminally failed payload and returns how many.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue could not be stored.
    pub fn remove_failed(&self) -> EngineResult<usize> {
        let removed = self.inner.queue.lock().remove_failed()?;
        info!(removed, "failed payloads removed");
        Ok(removed)
    }

    /// Empties the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue could not be stored.
    pub fn clear_all(&self) -> EngineResult<()> {
        self.inner.queue.lock().clear()?;
        Ok(())
    }

    /// Drops every payload of one kind and returns how many.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue could not be stored.
    pub fn clear_type(&self, sync_type: SyncType) -> EngineResult<usize> {
        let removed = self.inner.queue.lock().clear_by_type(sync_type)?;
        info!(%sync_type, removed, "payloads cleared");
        Ok(removed)
    }

    /// Captures status and queue contents for debugging.
    pub fn export_diagnostics(&self) -> SyncDiagnostics {
        let status = self.get_status();
        let items = self.inner.queue.lock().items().to_vec();
        SyncDiagnostics {
            exported_at: self.inner.clock.now_millis(),
            status,
            items,
        }
    }

    /// Replaces the queue contents with a JSON export.
    ///
    /// Payloads of kinds with no registered strategy are kept; a drain
    /// drops them when it reaches them.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed input or if the queue could not be
    /// stored.
    pub fn import_queue(&self, json: &str) -> EngineResult<usize> {
        let count = self.inner.queue.lock().import(json)?;
        self.spawn_drain("import");
        Ok(count)
    }

    /// Runs `f` with read access to the queue.
    pub fn inspect_queue<R>(&self, f: impl FnOnce(&PersistentQueue<S>) -> R) -> R {
        f(&self.inner.queue.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use async_trait::async_trait;
    use offsync_queue::{ManualClock, MenuRefresh, QueueConfig, WritePolicy};
    use offsync_storage::InMemoryStore;
    use std::sync::atomic::AtomicUsize;

    /// Menu strategy whose upload result is set by the test.
    #[derive(Default)]
    struct Menus {
        fail: Option<UploadError>,
        uploads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SyncStrategy for Menus {
        type Data = MenuRefresh;
        type Output = ();

        fn validate(&self, data: &MenuRefresh) -> bool {
            !data.venue_id.is_empty()
        }

        async fn upload(&self, _data: &MenuRefresh, _payload: &SyncPayload) -> Result<(), UploadError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            match &self.fail {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }

        fn priority(&self) -> u8 {
            4
        }

        fn max_retries(&self) -> u32 {
            2
        }
    }

    fn menu(venue: &str) -> MenuRefresh {
        MenuRefresh {
            venue_id: venue.into(),
            date: "2026-03-01".into(),
        }
    }

    fn coordinator() -> SyncCoordinator<InMemoryStore> {
        let config = EngineConfig::new().with_drain_on_enqueue(false);
        SyncCoordinator::with_clock(InMemoryStore::new(), config, Arc::new(ManualClock::new(1_000)))
            .unwrap()
    }

    #[test]
    fn sync_requires_strategy() {
        let coordinator = coordinator();
        let err = coordinator.sync(menu("north")).unwrap_err();
        assert!(matches!(err, EngineError::StrategyMissing(SyncType::Menu)));
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn invalid_data_is_not_enqueued() {
        let coordinator = coordinator();
        coordinator.register_strategy(Menus::default());

        let err = coordinator.sync(menu("")).unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn sync_uses_strategy_policy() {
        let coordinator = coordinator();
        coordinator.register_strategy(Menus::default());

        let id = coordinator.sync(menu("north")).unwrap();
        let (priority, max_retries) =
            coordinator.inspect_queue(|q| q.get(&id).map(|p| (p.priority, p.max_retries)).unwrap());
        assert_eq!(priority, 4);
        assert_eq!(max_retries, 2);
        assert_eq!(coordinator.get_pending_count(SyncType::Menu), 1);
    }

    #[test]
    fn sync_without_runtime_defers_drain() {
        let config = EngineConfig::new().with_start_online(true);
        let coordinator = SyncCoordinator::new(InMemoryStore::new(), config).unwrap();
        coordinator.register_strategy(Menus::default());

        coordinator.sync(menu("north")).unwrap();
        assert_eq!(coordinator.pending_count(), 1);
    }

    #[tokio::test]
    async fn offline_drain_is_skipped() {
        let coordinator = coordinator();
        coordinator.register_strategy(Menus::default());
        coordinator.sync(menu("north")).unwrap();

        let report = coordinator.process_queue().await;
        assert_eq!(report.skipped, Some(SkipReason::Offline));
        assert_eq!(coordinator.pending_count(), 1);
    }

    #[tokio::test]
    async fn successful_upload_removes_payload() {
        let coordinator = coordinator();
        let uploads = Arc::new(AtomicUsize::new(0));
        coordinator.register_strategy(Menus {
            uploads: Arc::clone(&uploads),
            ..Default::default()
        });
        coordinator.sync(menu("north")).unwrap();
        coordinator.set_online(true);

        let report = coordinator.process_queue().await;
        assert_eq!(report.processed_count, 1);
        assert_eq!(report.failed_count, 0);
        assert_eq!(uploads.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.pending_count(), 0);

        let status = coordinator.get_status();
        assert_eq!(status.total_processed, 1);
        assert_eq!(status.last_sync_time, Some(1_000));
        assert!(!status.is_processing);
        assert!(status.active_strategy_type.is_none());
    }

    #[tokio::test]
    async fn transient_failure_schedules_retry() {
        let coordinator = coordinator();
        coordinator.register_strategy(Menus {
            fail: Some(UploadError::transient("timeout")),
            ..Default::default()
        });
        let id = coordinator.sync(menu("north")).unwrap();
        coordinator.set_online(true);

        let report = coordinator.process_queue().await;
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.errors[0].kind, FailureKind::Transient);
        assert_eq!(report.errors[0].payload_id, id);

        let payload = coordinator.inspect_queue(|q| q.get(&id).cloned()).unwrap();
        assert_eq!(payload.retry_count, 1);
        assert_eq!(payload.next_retry_at, Some(2_000));
        assert_eq!(payload.error.as_deref(), Some("timeout"));

        // Backing off, so the next drain has nothing to do
        let report = coordinator.process_queue().await;
        assert_eq!(report.processed_count + report.failed_count, 0);
    }

    #[tokio::test]
    async fn permanent_failure_exhausts_payload() {
        let coordinator = coordinator();
        coordinator.register_strategy(Menus {
            fail: Some(UploadError::permanent("venue closed")),
            ..Default::default()
        });
        let id = coordinator.sync(menu("north")).unwrap();
        coordinator.set_online(true);

        let report = coordinator.process_queue().await;
        assert_eq!(report.errors[0].kind, FailureKind::Rejected);

        let payload = coordinator.inspect_queue(|q| q.get(&id).cloned()).unwrap();
        assert!(payload.is_exhausted());
        assert_eq!(coordinator.get_pending_count(SyncType::Menu), 0);
        assert_eq!(coordinator.get_status().queue.failed_items, 1);
    }

    #[tokio::test]
    async fn missing_strategy_drops_payload() {
        let coordinator = coordinator();
        coordinator.register_strategy(Menus::default());
        coordinator.sync(menu("north")).unwrap();
        assert!(coordinator.unregister_strategy(SyncType::Menu));
        coordinator.set_online(true);

        let report = coordinator.process_queue().await;
        assert_eq!(report.errors[0].kind, FailureKind::StrategyMissing);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn paused_engine_skips_drains() {
        let coordinator = coordinator();
        coordinator.register_strategy(Menus::default());
        coordinator.sync(menu("north")).unwrap();
        coordinator.set_online(true);

        coordinator.pause_sync();
        let report = coordinator.process_queue().await;
        assert_eq!(report.skipped, Some(SkipReason::Paused));
        assert!(coordinator.get_status().is_paused);

        coordinator.resume_sync();
        assert_eq!(coordinator.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn retry_failed_makes_payload_ready() {
        let coordinator = coordinator();
        coordinator.register_strategy(Menus {
            fail: Some(UploadError::permanent("no")),
            ..Default::default()
        });
        let id = coordinator.sync(menu("north")).unwrap();
        coordinator.set_online(true);
        coordinator.process_queue().await;
        coordinator.set_online(false);

        assert!(coordinator.retry_failed(&id).unwrap());
        let ready = coordinator.inspect_queue(|q| q.get_ready());
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].retry_count, 0);
        assert!(ready[0].error.is_none());

        assert!(!coordinator.retry_failed(&PayloadId::new()).unwrap());
    }

    #[test]
    fn clear_and_remove_failed() {
        let coordinator = coordinator();
        coordinator.register_strategy(Menus::default());
        coordinator.sync(menu("a")).unwrap();
        coordinator.sync(menu("b")).unwrap();

        assert_eq!(coordinator.remove_failed().unwrap(), 0);
        assert_eq!(coordinator.clear_type(SyncType::Photo).unwrap(), 0);
        assert_eq!(coordinator.clear_type(SyncType::Menu).unwrap(), 2);

        coordinator.sync(menu("c")).unwrap();
        coordinator.clear_all().unwrap();
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn diagnostics_round_trip_through_import() {
        let coordinator = coordinator();
        coordinator.register_strategy(Menus::default());
        coordinator.sync(menu("a")).unwrap();

        let diagnostics = coordinator.export_diagnostics();
        assert_eq!(diagnostics.items.len(), 1);
        assert_eq!(diagnostics.status.registered_types, vec![SyncType::Menu]);
        let json = diagnostics.to_json().unwrap();
        assert!(json.contains("\"registered_types\""));

        let export = coordinator.inspect_queue(|q| q.export()).unwrap();
        coordinator.clear_all().unwrap();
        assert_eq!(coordinator.import_queue(&export).unwrap(), 1);
        assert_eq!(coordinator.pending_count(), 1);
    }

    #[test]
    fn strict_write_failure_surfaces_from_sync() {
        let store = InMemoryStore::new();
        let config = EngineConfig::new()
            .with_drain_on_enqueue(false)
            .with_queue(QueueConfig::default().with_write_policy(WritePolicy::Strict));
        let coordinator = SyncCoordinator::new(Arc::new(store), config).unwrap();
        coordinator.register_strategy(Menus::default());

        coordinator.inspect_queue(|q| q.store().set_fail_writes(true));
        let err = coordinator.sync(menu("a")).unwrap_err();
        assert!(matches!(err, EngineError::Queue(_)));
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn registering_twice_replaces() {
        let coordinator = coordinator();
        assert!(!coordinator.register_strategy(Menus::default()));
        assert!(coordinator.register_strategy(Menus::default()));
        assert_eq!(coordinator.registered_types(), vec![SyncType::Menu]);
    }
}
