//! Test fixtures for queues and coordinators.
//!
//! Every fixture runs on a [`ManualClock`] so that backoff can be stepped
//! through without sleeping.

use offsync_engine::strategies::{register_reference_strategies, LocalCache, MockBackend};
use offsync_engine::{EngineConfig, SyncCoordinator};
use offsync_queue::{ManualClock, PersistentQueue, QueueConfig};
use offsync_storage::{FileStore, InMemoryStore};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Start time of every fixture clock (unix millis).
pub const FIXTURE_EPOCH_MILLIS: u64 = 1_767_225_600_000;

/// An in-memory queue that can be "restarted" over the same store.
pub struct TestQueue {
    /// The queue instance.
    pub queue: PersistentQueue<Arc<InMemoryStore>>,
    /// The backing store, shared with restarted queues.
    pub store: Arc<InMemoryStore>,
    /// The queue clock.
    pub clock: ManualClock,
}

impl TestQueue {
    /// Creates an empty queue with the default configuration.
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// Creates an empty queue with `config`.
    pub fn with_config(config: QueueConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = ManualClock::new(FIXTURE_EPOCH_MILLIS);
        let queue = PersistentQueue::with_clock(
            Arc::clone(&store),
            config,
            Arc::new(clock.clone()),
        )
        .expect("Failed to open in-memory queue");
        Self {
            queue,
            store,
            clock,
        }
    }

    /// Opens a second queue over the same store, as a new process would.
    pub fn reopen(&self) -> PersistentQueue<Arc<InMemoryStore>> {
        PersistentQueue::with_clock(
            Arc::clone(&self.store),
            self.queue.config().clone(),
            Arc::new(self.clock.clone()),
        )
        .expect("Failed to reopen queue")
    }
}

impl Default for TestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestQueue {
    type Target = PersistentQueue<Arc<InMemoryStore>>;

    fn deref(&self) -> &Self::Target {
        &self.queue
    }
}

impl std::ops::DerefMut for TestQueue {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.queue
    }
}

/// A directory-backed queue with automatic cleanup.
pub struct TestFileQueue {
    /// The queue instance.
    pub queue: PersistentQueue<FileStore>,
    /// The queue clock.
    pub clock: ManualClock,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestFileQueue {
    /// Creates an empty queue in a fresh temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let clock = ManualClock::new(FIXTURE_EPOCH_MILLIS);
        let queue = Self::open(temp_dir.path(), &clock);
        Self {
            queue,
            clock,
            temp_dir,
        }
    }

    /// Returns the store directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Closes the queue and opens the directory again.
    pub fn restart(self) -> Self {
        let Self {
            queue,
            clock,
            temp_dir,
        } = self;
        // Releases the directory lock
        drop(queue);
        let queue = Self::open(temp_dir.path(), &clock);
        Self {
            queue,
            clock,
            temp_dir,
        }
    }

    fn open(path: &Path, clock: &ManualClock) -> PersistentQueue<FileStore> {
        let store = FileStore::open(path).expect("Failed to open file store");
        PersistentQueue::with_clock(store, QueueConfig::default(), Arc::new(clock.clone()))
            .expect("Failed to open file queue")
    }
}

impl Default for TestFileQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestFileQueue {
    type Target = PersistentQueue<FileStore>;

    fn deref(&self) -> &Self::Target {
        &self.queue
    }
}

impl std::ops::DerefMut for TestFileQueue {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.queue
    }
}

/// A coordinator wired to the reference strategies and a mock backend.
///
/// Starts offline with drain-on-enqueue disabled, so tests decide when
/// drains happen.
pub struct TestCoordinator {
    /// The coordinator.
    pub coordinator: SyncCoordinator<Arc<InMemoryStore>>,
    /// The backing store.
    pub store: Arc<InMemoryStore>,
    /// The coordinator clock.
    pub clock: ManualClock,
    /// The backend used by the reference strategies.
    pub backend: Arc<MockBackend>,
    /// The cache updated by the reference strategies.
    pub cache: Arc<LocalCache>,
}

impl TestCoordinator {
    /// Creates a coordinator with the reference strategies registered.
    pub fn new() -> Self {
        Self::with_backend(MockBackend::new())
    }

    /// Creates a coordinator around a preconfigured backend.
    pub fn with_backend(backend: MockBackend) -> Self {
        Self::bare_with(EngineConfig::new().with_drain_on_enqueue(false), backend, true)
    }

    /// Creates a coordinator with no strategies registered.
    pub fn bare(config: EngineConfig) -> Self {
        Self::bare_with(config, MockBackend::new(), false)
    }

    fn bare_with(config: EngineConfig, backend: MockBackend, reference: bool) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = ManualClock::new(FIXTURE_EPOCH_MILLIS);
        let coordinator =
            SyncCoordinator::with_clock(Arc::clone(&store), config, Arc::new(clock.clone()))
                .expect("Failed to create coordinator");
        let backend = Arc::new(backend);
        let cache = Arc::new(LocalCache::new());
        if reference {
            register_reference_strategies(&coordinator, backend.clone(), Arc::clone(&cache));
        }
        Self {
            coordinator,
            store,
            clock,
            backend,
            cache,
        }
    }
}

impl Default for TestCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestCoordinator {
    type Target = SyncCoordinator<Arc<InMemoryStore>>;

    fn deref(&self) -> &Self::Target {
        &self.coordinator
    }
}

/// Sample task data that passes the reference validators.
pub mod samples {
    use offsync_queue::{
        MealItem, MealKind, MealSubmission, MenuRefresh, PhotoAnalysis, ProfileUpdate, SyncData,
    };

    /// A profile edit for `user_id`.
    pub fn profile(user_id: &str) -> ProfileUpdate {
        ProfileUpdate {
            user_id: user_id.to_string(),
            display_name: Some("Test User".to_string()),
            daily_calorie_target: Some(2_000),
            dietary_preferences: vec!["vegetarian".to_string()],
            updated_at: super::FIXTURE_EPOCH_MILLIS,
        }
    }

    /// A one-item lunch.
    pub fn meal(local_id: &str) -> MealSubmission {
        MealSubmission {
            local_id: local_id.to_string(),
            user_id: "user-1".to_string(),
            meal_kind: MealKind::Lunch,
            items: vec![MealItem {
                name: "lentil soup".to_string(),
                calories: 320,
                quantity: 1.0,
            }],
            eaten_at: super::FIXTURE_EPOCH_MILLIS,
            notes: None,
        }
    }

    /// A menu refresh for `venue_id` on a fixed day.
    pub fn menu(venue_id: &str) -> MenuRefresh {
        MenuRefresh {
            venue_id: venue_id.to_string(),
            date: "2026-01-01".to_string(),
        }
    }

    /// A 512 KiB JPEG.
    pub fn photo(local_id: &str) -> PhotoAnalysis {
        PhotoAnalysis {
            local_id: local_id.to_string(),
            user_id: "user-1".to_string(),
            image_path: format!("/photos/{local_id}.jpg"),
            mime_type: "image/jpeg".to_string(),
            byte_len: 512 * 1024,
            meal_local_id: None,
        }
    }

    /// One sample of every task kind, in declaration order.
    pub fn one_of_each() -> Vec<SyncData> {
        vec![
            profile("user-1").into(),
            meal("meal-1").into(),
            menu("venue-1").into(),
            photo("photo-1").into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offsync_queue::SyncType;

    #[test]
    fn test_queue_reopen_sees_writes() {
        let mut queue = TestQueue::new();
        queue.add(samples::menu("north").into(), 4, 2).unwrap();

        let reopened = queue.reopen();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.items(), queue.items());
    }

    #[test]
    fn test_file_queue_restart() {
        let mut queue = TestFileQueue::new();
        queue.add(samples::meal("m1").into(), 1, 5).unwrap();
        assert!(queue.path().join("LOCK").exists());

        let queue = queue.restart();
        assert_eq!(queue.pending_count(SyncType::Meal), 1);
    }

    #[test]
    fn test_coordinator_accepts_samples() {
        let fixture = TestCoordinator::new();
        for data in samples::one_of_each() {
            fixture.sync_data(data).unwrap();
        }
        assert_eq!(fixture.pending_count(), 4);
        assert!(!fixture.is_online());
    }
}
