use super::{LocalCache, MealReceipt, RecordStatus, RemoteBackend};
use crate::error::UploadError;
use crate::strategy::SyncStrategy;
use async_trait::async_trait;
use offsync_queue::{MealSubmission, SyncPayload, SyncType, TaskData};
use std::sync::Arc;
use tracing::debug;

/// Submits logged meals. Highest priority of the reference strategies.
pub struct MealSyncStrategy {
    backend: Arc<dyn RemoteBackend>,
    cache: Arc<LocalCache>,
}

impl MealSyncStrategy {
    /// Creates the strategy.
    pub fn new(backend: Arc<dyn RemoteBackend>, cache: Arc<LocalCache>) -> Self {
        Self { backend, cache }
    }
}

#[async_trait]
impl SyncStrategy for MealSyncStrategy {
    type Data = MealSubmission;
    type Output = MealReceipt;

    fn validate(&self, meal: &MealSubmission) -> bool {
        !meal.local_id.is_empty()
            && !meal.user_id.is_empty()
            && !meal.items.is_empty()
            && meal.items.iter().all(|item| {
                !item.name.trim().is_empty() && item.quantity.is_finite() && item.quantity > 0.0
            })
    }

    fn on_enqueued(&self, payload: &SyncPayload) {
        if let Some(meal) = MealSubmission::from_sync_data(&payload.data) {
            self.cache
                .set_status(SyncType::Meal, &meal.local_id, RecordStatus::Pending);
        }
    }

    async fn upload(
        &self,
        meal: &MealSubmission,
        _payload: &SyncPayload,
    ) -> Result<MealReceipt, UploadError> {
        Ok(self.backend.submit_meal(meal).await?)
    }

    async fn on_success(&self, receipt: MealReceipt, payload: &SyncPayload) {
        let Some(meal) = MealSubmission::from_sync_data(&payload.data) else {
            return;
        };
        debug!(local_id = %meal.local_id, remote_id = %receipt.remote_id, "meal confirmed");
        self.cache
            .set_status(SyncType::Meal, &meal.local_id, RecordStatus::Synced);
        self.cache.store_meal_receipt(&meal.local_id, receipt);
    }

    async fn on_failure(&self, error: &UploadError, payload: &SyncPayload) {
        if let Some(meal) = MealSubmission::from_sync_data(&payload.data) {
            super::mark_failed(&self.cache, SyncType::Meal, &meal.local_id, error, payload);
        }
    }

    fn priority(&self) -> u8 {
        1
    }

    fn max_retries(&self) -> u32 {
        5
    }
}
