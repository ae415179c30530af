//! Connectivity notification.
//!
//! Platform code reports reachability into a [`ConnectivityMonitor`]; the
//! coordinator subscribes through [`crate::SyncCoordinator::listen`] and
//! drains the queue on every offline → online transition.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Push-based source of online/offline transitions.
///
/// Clones share the same channel.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with an initial state.
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Reports the current reachability. Returns true if it changed.
    ///
    /// Subscribers are only woken on a change.
    pub fn set_online(&self, online: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        })
    }

    /// Returns the last reported state.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Creates a receiver for transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Handle to a running connectivity subscription.
///
/// Dropping the handle stops the subscription.
#[derive(Debug)]
pub struct ConnectivityListener {
    task: JoinHandle<()>,
}

impl ConnectivityListener {
    pub(crate) fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    /// Stops listening.
    pub fn stop(self) {
        // Drop does the work
    }

    /// Returns true if the subscription ended (feed closed or stopped).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ConnectivityListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}
