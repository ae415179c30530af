//! Configuration for the sync coordinator.

use offsync_queue::QueueConfig;

/// Configuration for a [`crate::SyncCoordinator`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Connectivity assumed until the first notification arrives.
    pub start_online: bool,
    /// Whether `sync()` spawns a drain right after enqueueing.
    pub drain_on_enqueue: bool,
    /// Batch size used by `SyncCoordinator::sync_background_tick`.
    pub background_batch_size: usize,
    /// Queue configuration.
    pub queue: QueueConfig,
}

impl EngineConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self {
            start_online: false,
            drain_on_enqueue: true,
            background_batch_size: 10,
            queue: QueueConfig::default(),
        }
    }

    /// Sets the connectivity assumed at startup.
    pub fn with_start_online(mut self, online: bool) -> Self {
        self.start_online = online;
        self
    }

    /// Enables or disables draining right after `sync()`.
    pub fn with_drain_on_enqueue(mut self, enabled: bool) -> Self {
        self.drain_on_enqueue = enabled;
        self
    }

    /// Sets the background batch size.
    pub fn with_background_batch_size(mut self, size: usize) -> Self {
        self.background_batch_size = size;
        self
    }

    /// Sets the queue configuration.
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
