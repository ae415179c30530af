//! A strategy whose upload outcomes are scripted by the test.

use async_trait::async_trait;
use offsync_engine::{SyncStrategy, UploadError};
use offsync_queue::{PayloadId, SyncPayload, TaskData};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct ScriptState {
    outcomes: Mutex<VecDeque<Result<(), UploadError>>>,
    calls: Mutex<Vec<PayloadId>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    successes: AtomicUsize,
    failures: AtomicUsize,
}

/// Test-side handle to a [`ScriptedStrategy`].
///
/// Stays usable after the strategy is moved into a coordinator.
#[derive(Debug, Clone, Default)]
pub struct ScriptHandle {
    state: Arc<ScriptState>,
}

impl ScriptHandle {
    /// Queues the outcome of a future upload. Unscripted uploads succeed.
    pub fn push_outcome(&self, outcome: Result<(), UploadError>) {
        self.state.outcomes.lock().push_back(outcome);
    }

    /// Makes the next upload fail with a retryable error.
    pub fn fail_transient(&self, message: &str) {
        self.push_outcome(Err(UploadError::transient(message)));
    }

    /// Makes the next upload fail with a non-retryable error.
    pub fn fail_permanent(&self, message: &str) {
        self.push_outcome(Err(UploadError::permanent(message)));
    }

    /// Payloads uploaded so far, in call order.
    pub fn calls(&self) -> Vec<PayloadId> {
        self.state.calls.lock().clone()
    }

    /// Number of uploads started.
    pub fn call_count(&self) -> usize {
        self.state.calls.lock().len()
    }

    /// Largest number of uploads that ran at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of uploads that succeeded.
    pub fn successes(&self) -> usize {
        self.state.successes.load(Ordering::SeqCst)
    }

    /// Number of uploads that failed.
    pub fn failures(&self) -> usize {
        self.state.failures.load(Ordering::SeqCst)
    }
}

/// Strategy for any task kind that does no remote work.
///
/// Uploads pop the next scripted outcome and record overlap, which makes
/// single-flight and retry behavior observable.
pub struct ScriptedStrategy<D> {
    handle: ScriptHandle,
    priority: u8,
    max_retries: u32,
    delay: Duration,
    validator: fn(&D) -> bool,
    _data: PhantomData<fn() -> D>,
}

impl<D: TaskData> ScriptedStrategy<D> {
    /// Creates a strategy and its handle. All data validates.
    pub fn new(priority: u8, max_retries: u32) -> (Self, ScriptHandle) {
        let handle = ScriptHandle::default();
        let strategy = Self {
            handle: handle.clone(),
            priority,
            max_retries,
            delay: Duration::ZERO,
            validator: |_| true,
            _data: PhantomData,
        };
        (strategy, handle)
    }

    /// Makes every upload take `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replaces the validation rule.
    pub fn with_validator(mut self, validator: fn(&D) -> bool) -> Self {
        self.validator = validator;
        self
    }
}

#[async_trait]
impl<D: TaskData> SyncStrategy for ScriptedStrategy<D> {
    type Data = D;
    type Output = ();

    fn validate(&self, data: &D) -> bool {
        (self.validator)(data)
    }

    async fn upload(&self, _data: &D, payload: &SyncPayload) -> Result<(), UploadError> {
        let state = &self.handle.state;
        state.calls.lock().push(payload.id);
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        state.in_flight.fetch_sub(1, Ordering::SeqCst);
        let outcome = state.outcomes.lock().pop_front().unwrap_or(Ok(()));
        match &outcome {
            Ok(()) => state.successes.fetch_add(1, Ordering::SeqCst),
            Err(_) => state.failures.fetch_add(1, Ordering::SeqCst),
        };
        outcome
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
