//! Configuration for the persistent queue.

use crate::backoff::BackoffSchedule;

/// Storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "sync_queue";

/// What the queue does when persisting a mutation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Log the failure and keep the in-memory mutation.
    ///
    /// Memory and storage may disagree until the next successful write.
    #[default]
    BestEffort,
    /// Roll the in-memory mutation back and return the storage error.
    Strict,
}

/// Configuration for a [`crate::PersistentQueue`].
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Key of the snapshot blob in the durable store.
    pub storage_key: String,
    /// Delays between retries.
    pub backoff: BackoffSchedule,
    /// Retry budget used by [`crate::PersistentQueue::add_default`].
    pub default_max_retries: u32,
    /// Behaviour on write failure.
    pub write_policy: WritePolicy,
}

impl QueueConfig {
    /// Creates a configuration storing its snapshot under `storage_key`.
    pub fn new(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
            backoff: BackoffSchedule::default(),
            default_max_retries: 3,
            write_policy: WritePolicy::BestEffort,
        }
    }

    /// Sets the backoff schedule.
    pub fn with_backoff(mut self, backoff: BackoffSchedule) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the default retry budget.
    pub fn with_default_max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries;
        self
    }

    /// Sets the write-failure policy.
    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_KEY)
    }
}
