//! Reference strategies for the four task kinds.
//!
//! Each strategy calls one [`RemoteBackend`] operation and mirrors the
//! outcome into a shared [`LocalCache`].
//!
//! | Strategy | Priority | Max retries |
//! |---|---|---|
//! | [`MealSyncStrategy`] | 1 | 5 |
//! | [`ProfileSyncStrategy`] | 2 | 5 |
//! | [`PhotoAnalysisStrategy`] | 3 | 3 |
//! | [`MenuRefreshStrategy`] | 4 | 2 |

mod backend;
mod cache;
mod meal;
mod menu;
mod photo;
mod profile;

pub use backend::{
    DetectedFood, Dish, MealReceipt, Menu, MockBackend, PhotoResult, ProfileRecord, RemoteBackend,
    RemoteCall, RemoteError,
};
pub use cache::{LocalCache, RecordStatus};
pub use meal::MealSyncStrategy;
pub use menu::MenuRefreshStrategy;
pub use photo::{PhotoAnalysisStrategy, MAX_PHOTO_BYTES, SUPPORTED_IMAGE_TYPES};
pub use profile::ProfileSyncStrategy;

use crate::coordinator::SyncCoordinator;
use crate::error::UploadError;
use offsync_queue::{SyncPayload, SyncType};
use offsync_storage::DurableStore;
use std::sync::Arc;

/// Registers all four reference strategies, sharing one backend and cache.
pub fn register_reference_strategies<S: DurableStore + 'static>(
    coordinator: &SyncCoordinator<S>,
    backend: Arc<dyn RemoteBackend>,
    cache: Arc<LocalCache>,
) {
    coordinator.register_strategy(ProfileSyncStrategy::new(
        Arc::clone(&backend),
        Arc::clone(&cache),
    ));
    coordinator.register_strategy(MealSyncStrategy::new(Arc::clone(&backend), Arc::clone(&cache)));
    coordinator.register_strategy(MenuRefreshStrategy::new(
        Arc::clone(&backend),
        Arc::clone(&cache),
    ));
    coordinator.register_strategy(PhotoAnalysisStrategy::new(backend, cache));
}

/// Status a failed attempt leaves on the local record.
///
/// Called before the queue records the failure, so the attempt that uses
/// the last retry is the one with `retry_count + 1 == max_retries`.
fn status_after(error: &UploadError, payload: &SyncPayload) -> RecordStatus {
    let retries_left = payload.retry_count.saturating_add(1) < payload.max_retries;
    if error.is_retryable() && retries_left {
        RecordStatus::RetryPending
    } else {
        RecordStatus::Failed
    }
}

fn mark_failed(
    cache: &LocalCache,
    sync_type: SyncType,
    record_id: &str,
    error: &UploadError,
    payload: &SyncPayload,
) {
    cache.set_status(sync_type, record_id, status_after(error, payload));
}
