use super::{LocalCache, PhotoResult, RecordStatus, RemoteBackend};
use crate::error::UploadError;
use crate::strategy::SyncStrategy;
use async_trait::async_trait;
use offsync_queue::{PayloadDraft, PhotoAnalysis, SyncPayload, SyncType, TaskData};
use std::sync::Arc;
use tracing::debug;

/// Largest photo accepted for analysis.
pub const MAX_PHOTO_BYTES: u64 = 10 * 1024 * 1024;

/// MIME types accepted for analysis.
pub const SUPPORTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/heic", "image/webp"];

/// Sends meal photos for food recognition.
pub struct PhotoAnalysisStrategy {
    backend: Arc<dyn RemoteBackend>,
    cache: Arc<LocalCache>,
}

impl PhotoAnalysisStrategy {
    /// Creates the strategy.
    pub fn new(backend: Arc<dyn RemoteBackend>, cache: Arc<LocalCache>) -> Self {
        Self { backend, cache }
    }
}

#[async_trait]
impl SyncStrategy for PhotoAnalysisStrategy {
    type Data = PhotoAnalysis;
    type Output = PhotoResult;

    fn validate(&self, photo: &PhotoAnalysis) -> bool {
        !photo.image_path.trim().is_empty()
            && SUPPORTED_IMAGE_TYPES
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&photo.mime_type))
            && (1..=MAX_PHOTO_BYTES).contains(&photo.byte_len)
    }

    fn prepare(&self, mut photo: PhotoAnalysis) -> PayloadDraft {
        photo.mime_type = photo.mime_type.to_ascii_lowercase();
        PayloadDraft::new(photo, self.priority(), self.max_retries())
    }

    fn on_enqueued(&self, payload: &SyncPayload) {
        if let Some(photo) = PhotoAnalysis::from_sync_data(&payload.data) {
            self.cache
                .set_status(SyncType::Photo, &photo.local_id, RecordStatus::Pending);
        }
    }

    async fn upload(
        &self,
        photo: &PhotoAnalysis,
        _payload: &SyncPayload,
    ) -> Result<PhotoResult, UploadError> {
        Ok(self.backend.analyze_photo(photo).await?)
    }

    async fn on_success(&self, result: PhotoResult, payload: &SyncPayload) {
        let Some(photo) = PhotoAnalysis::from_sync_data(&payload.data) else {
            return;
        };
        debug!(
            local_id = %photo.local_id,
            foods = result.foods.len(),
            calories = result.estimated_calories(),
            "photo analyzed"
        );
        self.cache
            .set_status(SyncType::Photo, &photo.local_id, RecordStatus::Synced);
        self.cache.store_analysis(&photo.local_id, result);
    }

    async fn on_failure(&self, error: &UploadError, payload: &SyncPayload) {
        if let Some(photo) = PhotoAnalysis::from_sync_data(&payload.data) {
            super::mark_failed(&self.cache, SyncType::Photo, &photo.local_id, error, payload);
        }
    }

    fn priority(&self) -> u8 {
        3
    }

    fn max_retries(&self) -> u32 {
        3
    }
}
