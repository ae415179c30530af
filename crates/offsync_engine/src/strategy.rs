//! Strategy trait and the type-keyed strategy registry.

use crate::error::UploadError;
use async_trait::async_trait;
use offsync_queue::{PayloadDraft, SyncData, SyncPayload, SyncType, TaskData};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Domain logic for one task kind.
///
/// The coordinator never looks inside task data; it only drives a strategy
/// through these methods. Uploads are never run concurrently, across all
/// strategies, so implementations need no locking of their own for that.
///
/// The task kind is fixed by [`SyncStrategy::Data`], so a strategy cannot
/// be registered under the wrong kind.
#[async_trait]
pub trait SyncStrategy: Send + Sync + 'static {
    /// Typed data this strategy handles.
    type Data: TaskData;
    /// Value produced by a successful upload, handed to `on_success`.
    type Output: Send + 'static;

    /// Cheap synchronous pre-check; rejected data never enters the queue.
    fn validate(&self, data: &Self::Data) -> bool;

    /// Turns raw input into an enqueueable draft.
    ///
    /// The default wraps the data with this strategy's priority and retry
    /// budget. Overrides may normalize the data first.
    fn prepare(&self, data: Self::Data) -> PayloadDraft {
        PayloadDraft::new(data.into_sync_data(), self.priority(), self.max_retries())
    }

    /// Applies local side effects once the payload is in the queue.
    ///
    /// Not called when the enqueue fails.
    fn on_enqueued(&self, payload: &SyncPayload) {
        let _ = payload;
    }

    /// Performs the remote operation.
    async fn upload(
        &self,
        data: &Self::Data,
        payload: &SyncPayload,
    ) -> Result<Self::Output, UploadError>;

    /// Applies local side effects of a successful upload.
    ///
    /// Runs before the payload is removed from the queue.
    async fn on_success(&self, output: Self::Output, payload: &SyncPayload) {
        let _ = (output, payload);
    }

    /// Applies local side effects of a failed attempt.
    ///
    /// Runs before the failure is recorded in the queue.
    async fn on_failure(&self, error: &UploadError, payload: &SyncPayload) {
        let _ = (error, payload);
    }

    /// Priority used when enqueueing through this strategy.
    fn priority(&self) -> u8;

    /// Retry budget used when enqueueing through this strategy.
    fn max_retries(&self) -> u32;
}

/// Object-safe view of a [`SyncStrategy`] over untyped [`SyncData`].
#[async_trait]
pub(crate) trait ErasedStrategy: Send + Sync {
    fn validate(&self, data: &SyncData) -> bool;

    fn prepare(&self, data: &SyncData) -> Option<PayloadDraft>;

    fn enqueued(&self, payload: &SyncPayload);

    /// Uploads and runs the matching side-effect hook.
    async fn execute(&self, payload: &SyncPayload) -> Result<(), UploadError>;
}

struct Erased<S>(S);

#[async_trait]
impl<S: SyncStrategy> ErasedStrategy for Erased<S> {
    fn validate(&self, data: &SyncData) -> bool {
        S::Data::from_sync_data(data).is_some_and(|typed| self.0.validate(typed))
    }

    fn prepare(&self, data: &SyncData) -> Option<PayloadDraft> {
        let typed = S::Data::from_sync_data(data)?.clone();
        let draft = self.0.prepare(typed);
        if draft.data.sync_type() != S::Data::SYNC_TYPE {
            warn!(
                expected = %S::Data::SYNC_TYPE,
                actual = %draft.data.sync_type(),
                "strategy prepared data of another type"
            );
            return None;
        }
        Some(draft)
    }

    fn enqueued(&self, payload: &SyncPayload) {
        self.0.on_enqueued(payload);
    }

    async fn execute(&self, payload: &SyncPayload) -> Result<(), UploadError> {
        // Stored data is re-checked: it may predate the current validation
        // rules or have been imported from outside.
        let checked = match S::Data::from_sync_data(&payload.data) {
            None => Err(UploadError::permanent(format!(
                "payload data is not {}",
                S::Data::SYNC_TYPE
            ))),
            Some(data) if !self.0.validate(data) => Err(UploadError::permanent(
                "stored payload no longer passes validation",
            )),
            Some(data) => Ok(data),
        };

        let result = match checked {
            Ok(data) => self.0.upload(data, payload).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(output) => {
                self.0.on_success(output, payload).await;
                Ok(())
            }
            Err(err) => {
                self.0.on_failure(&err, payload).await;
                Err(err)
            }
        }
    }
}

/// Table of strategies keyed by task kind.
#[derive(Default)]
pub(crate) struct StrategyRegistry {
    strategies: HashMap<SyncType, Arc<dyn ErasedStrategy>>,
}

impl StrategyRegistry {
    /// Registers `strategy` under its data's kind. Returns true if it
    /// replaced an earlier registration.
    pub(crate) fn register<S: SyncStrategy>(&mut self, strategy: S) -> bool {
        self.strategies
            .insert(S::Data::SYNC_TYPE, Arc::new(Erased(strategy)))
            .is_some()
    }

    pub(crate) fn unregister(&mut self, sync_type: SyncType) -> bool {
        self.strategies.remove(&sync_type).is_some()
    }

    pub(crate) fn get(&self, sync_type: SyncType) -> Option<Arc<dyn ErasedStrategy>> {
        self.strategies.get(&sync_type).cloned()
    }

    pub(crate) fn types(&self) -> Vec<SyncType> {
        let mut types: Vec<SyncType> = self.strategies.keys().copied().collect();
        types.sort();
        types
    }
}
