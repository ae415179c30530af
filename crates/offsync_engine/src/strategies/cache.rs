//! Local cache updated by the reference strategies.

use super::backend::{MealReceipt, Menu, PhotoResult, ProfileRecord};
use offsync_queue::SyncType;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

/// Sync status of a locally created record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Queued, not yet uploaded.
    Pending,
    /// Confirmed by the server.
    Synced,
    /// Last attempt failed; another is scheduled.
    RetryPending,
    /// The server rejected it.
    Failed,
}

/// Device-side state the strategies keep in step with the server.
#[derive(Debug, Default)]
pub struct LocalCache {
    statuses: RwLock<HashMap<(SyncType, String), RecordStatus>>,
    profile: RwLock<Option<ProfileRecord>>,
    meals: RwLock<HashMap<String, MealReceipt>>,
    menus: RwLock<HashMap<(String, String), Menu>>,
    analyses: RwLock<HashMap<String, PhotoResult>>,
}

impl LocalCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status of a record.
    pub fn set_status(&self, sync_type: SyncType, record_id: &str, status: RecordStatus) {
        self.statuses
            .write()
            .insert((sync_type, record_id.to_string()), status);
    }

    /// Returns the status of a record.
    pub fn status(&self, sync_type: SyncType, record_id: &str) -> Option<RecordStatus> {
        self.statuses
            .read()
            .get(&(sync_type, record_id.to_string()))
            .copied()
    }

    /// Number of records in a given status.
    pub fn count_with_status(&self, status: RecordStatus) -> usize {
        self.statuses.read().values().filter(|s| **s == status).count()
    }

    /// Last profile confirmed by the server.
    pub fn profile(&self) -> Option<ProfileRecord> {
        self.profile.read().clone()
    }

    pub(crate) fn store_profile(&self, profile: ProfileRecord) {
        *self.profile.write() = Some(profile);
    }

    /// Server receipt for a meal.
    pub fn meal_receipt(&self, local_id: &str) -> Option<MealReceipt> {
        self.meals.read().get(local_id).cloned()
    }

    pub(crate) fn store_meal_receipt(&self, local_id: &str, receipt: MealReceipt) {
        self.meals.write().insert(local_id.to_string(), receipt);
    }

    /// Cached menu of a venue for one day.
    pub fn menu(&self, venue_id: &str, date: &str) -> Option<Menu> {
        self.menus
            .read()
            .get(&(venue_id.to_string(), date.to_string()))
            .cloned()
    }

    pub(crate) fn store_menu(&self, menu: Menu) {
        self.menus
            .write()
            .insert((menu.venue_id.clone(), menu.date.clone()), menu);
    }

    /// Analysis result of a photo.
    pub fn analysis(&self, local_id: &str) -> Option<PhotoResult> {
        self.analyses.read().get(local_id).cloned()
    }

    pub(crate) fn store_analysis(&self, local_id: &str, result: PhotoResult) {
        self.analyses.write().insert(local_id.to_string(), result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_keyed_by_type_and_id() {
        let cache = LocalCache::new();
        cache.set_status(SyncType::Meal, "m1", RecordStatus::Pending);
        cache.set_status(SyncType::Photo, "m1", RecordStatus::Synced);

        assert_eq!(cache.status(SyncType::Meal, "m1"), Some(RecordStatus::Pending));
        assert_eq!(cache.status(SyncType::Photo, "m1"), Some(RecordStatus::Synced));
        assert_eq!(cache.status(SyncType::Meal, "m2"), None);

        cache.set_status(SyncType::Meal, "m1", RecordStatus::Synced);
        assert_eq!(cache.count_with_status(RecordStatus::Synced), 2);
        assert_eq!(cache.count_with_status(RecordStatus::Pending), 0);
    }
}
