use super::{LocalCache, ProfileRecord, RecordStatus, RemoteBackend};
use crate::error::UploadError;
use crate::strategy::SyncStrategy;
use async_trait::async_trait;
use offsync_queue::{PayloadDraft, ProfileUpdate, SyncPayload, SyncType, TaskData};
use std::sync::Arc;
use tracing::debug;

const MAX_NAME_CHARS: usize = 64;
const CALORIE_TARGET_RANGE: std::ops::RangeInclusive<u32> = 500..=10_000;

/// Pushes profile edits to the server.
pub struct ProfileSyncStrategy {
    backend: Arc<dyn RemoteBackend>,
    cache: Arc<LocalCache>,
}

impl ProfileSyncStrategy {
    /// Creates the strategy.
    pub fn new(backend: Arc<dyn RemoteBackend>, cache: Arc<LocalCache>) -> Self {
        Self { backend, cache }
    }
}

#[async_trait]
impl SyncStrategy for ProfileSyncStrategy {
    type Data = ProfileUpdate;
    type Output = ProfileRecord;

    fn validate(&self, data: &ProfileUpdate) -> bool {
        if data.user_id.trim().is_empty() {
            return false;
        }
        if let Some(name) = &data.display_name {
            let name = name.trim();
            if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
                return false;
            }
        }
        match data.daily_calorie_target {
            Some(target) => CALORIE_TARGET_RANGE.contains(&target),
            None => true,
        }
    }

    fn prepare(&self, mut data: ProfileUpdate) -> PayloadDraft {
        data.display_name = data.display_name.map(|name| name.trim().to_string());
        data.dietary_preferences = data
            .dietary_preferences
            .iter()
            .map(|pref| pref.trim().to_lowercase())
            .filter(|pref| !pref.is_empty())
            .collect();
        data.dietary_preferences.sort();
        data.dietary_preferences.dedup();

        PayloadDraft::new(data, self.priority(), self.max_retries())
    }

    fn on_enqueued(&self, payload: &SyncPayload) {
        if let Some(data) = ProfileUpdate::from_sync_data(&payload.data) {
            self.cache
                .set_status(SyncType::Profile, &data.user_id, RecordStatus::Pending);
        }
    }

    async fn upload(
        &self,
        data: &ProfileUpdate,
        _payload: &SyncPayload,
    ) -> Result<ProfileRecord, UploadError> {
        Ok(self.backend.upsert_profile(data).await?)
    }

    async fn on_success(&self, record: ProfileRecord, payload: &SyncPayload) {
        debug!(id = %payload.id, revision = record.revision, "profile confirmed");
        self.cache
            .set_status(SyncType::Profile, &record.user_id, RecordStatus::Synced);
        self.cache.store_profile(record);
    }

    async fn on_failure(&self, error: &UploadError, payload: &SyncPayload) {
        if let Some(data) = ProfileUpdate::from_sync_data(&payload.data) {
            super::mark_failed(&self.cache, SyncType::Profile, &data.user_id, error, payload);
        }
    }

    fn priority(&self) -> u8 {
        2
    }

    fn max_retries(&self) -> u32 {
        5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::MockBackend;

    fn strategy() -> ProfileSyncStrategy {
        ProfileSyncStrategy::new(Arc::new(MockBackend::new()), Arc::new(LocalCache::new()))
    }

    fn update() -> ProfileUpdate {
        ProfileUpdate {
            user_id: "u1".into(),
            display_name: Some("  Ada  ".into()),
            daily_calorie_target: Some(2_000),
            dietary_preferences: vec!["Vegan".into(), "vegan ".into(), "".into()],
            updated_at: 7,
        }
    }

    #[test]
    fn validation_rules() {
        let strategy = strategy();
        assert!(strategy.validate(&update()));

        let mut data = update();
        data.user_id = " ".into();
        assert!(!strategy.validate(&data));

        let mut data = update();
        data.display_name = Some("x".repeat(65));
        assert!(!strategy.validate(&data));
        data.display_name = Some("x".repeat(64));
        assert!(strategy.validate(&data));

        let mut data = update();
        data.daily_calorie_target = Some(499);
        assert!(!strategy.validate(&data));
        data.daily_calorie_target = Some(10_001);
        assert!(!strategy.validate(&data));
        data.daily_calorie_target = None;
        assert!(strategy.validate(&data));
    }

    #[test]
    fn prepare_normalizes_without_touching_cache() {
        let strategy = strategy();
        let draft = strategy.prepare(update());
        let data = ProfileUpdate::from_sync_data(&draft.data).unwrap();

        assert_eq!(data.display_name.as_deref(), Some("Ada"));
        assert_eq!(data.dietary_preferences, vec!["vegan".to_string()]);
        assert_eq!(draft.priority, 2);
        assert_eq!(draft.max_retries, 5);
        assert_eq!(strategy.cache.status(SyncType::Profile, "u1"), None);

        strategy.on_enqueued(&SyncPayload::from_draft(draft, 0));
        assert_eq!(
            strategy.cache.status(SyncType::Profile, "u1"),
            Some(RecordStatus::Pending)
        );
    }
}
