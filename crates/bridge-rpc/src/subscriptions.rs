//! Subscription identity and worker lifecycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

/// Owns every active watch worker.
///
/// Ids are positive, monotonically increasing, and never reused within a
/// process run; clients must treat them as opaque. Each worker holds the
/// receiving end of its cancel channel and stops at its next suspension
/// point once signalled; an in-flight notification write completes first.
pub struct SubscriptionManager {
    next_id: AtomicU64,
    workers: Mutex<HashMap<u64, broadcast::Sender<()>>>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves the next subscription id.
    pub fn allocate(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Registers the cancel handle of the worker spawned for `id`.
    pub fn insert(&self, id: u64, cancel: broadcast::Sender<()>) {
        self.workers
            .lock()
            .expect("subscriptions mutex poisoned")
            .insert(id, cancel);
    }

    /// Signals the worker for `id` to stop. Unknown ids are a no-op so
    /// unsubscribe stays idempotent.
    pub fn cancel(&self, id: u64) {
        let cancel = self
            .workers
            .lock()
            .expect("subscriptions mutex poisoned")
            .remove(&id);
        if let Some(cancel) = cancel {
            let _ = cancel.send(());
            debug!(subscription = id, "subscription cancelled");
        }
    }

    /// Worker self-removal after a terminal failure.
    pub(crate) fn remove(&self, id: u64) {
        self.workers
            .lock()
            .expect("subscriptions mutex poisoned")
            .remove(&id);
    }

    /// Cancels every worker; used at EOF and process exit.
    pub fn shutdown(&self) {
        let mut workers = self.workers.lock().expect("subscriptions mutex poisoned");
        let count = workers.len();
        for (_, cancel) in workers.drain() {
            let _ = cancel.send(());
        }
        if count > 0 {
            debug!(count, "cancelled all subscriptions");
        }
    }

    /// Number of live subscriptions; used by tests.
    pub fn active(&self) -> usize {
        self.workers.lock().expect("subscriptions mutex poisoned").len()
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let manager = SubscriptionManager::new();
        let first = manager.allocate();
        let second = manager.allocate();
        assert_eq!(first, 1);
        assert!(second > first);
    }

    #[test]
    fn cancel_signals_and_removes() {
        let manager = SubscriptionManager::new();
        let id = manager.allocate();
        let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
        manager.insert(id, cancel_tx);
        assert_eq!(manager.active(), 1);

        manager.cancel(id);
        assert_eq!(manager.active(), 0);
        assert!(cancel_rx.try_recv().is_ok());
    }

    #[test]
    fn cancel_of_unknown_id_is_a_no_op() {
        let manager = SubscriptionManager::new();
        manager.cancel(12345);
        assert_eq!(manager.active(), 0);
    }

    #[test]
    fn shutdown_cancels_everything() {
        let manager = SubscriptionManager::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let id = manager.allocate();
            let (cancel_tx, cancel_rx) = broadcast::channel(1);
            manager.insert(id, cancel_tx);
            receivers.push(cancel_rx);
        }

        manager.shutdown();
        assert_eq!(manager.active(), 0);
        for mut rx in receivers {
            assert!(rx.try_recv().is_ok());
        }
    }
}
