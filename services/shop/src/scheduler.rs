//! Delayed order auto-advance scheduling
//!
//! Pending timers live in a process-wide map keyed by order id so that a
//! later terminal-status write can actually cancel them. Handles are not
//! persisted: a process restart loses every pending timer, and an order
//! left mid-assembly never auto-advances afterwards.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

struct PendingTask {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Tracks one pending delayed action per order.
#[derive(Clone, Default)]
pub struct OrderScheduler {
    tasks: Arc<Mutex<HashMap<Uuid, PendingTask>>>,
    next_generation: Arc<AtomicU64>,
}

impl OrderScheduler {
    /// Create a new scheduler with no pending tasks
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to run once after `delay`, replacing any action
    /// already pending for this order.
    pub async fn schedule<F, Fut>(&self, order_id: Uuid, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let tasks = Arc::clone(&self.tasks);
        let mut guard = self.tasks.lock().await;

        if let Some(previous) = guard.remove(&order_id) {
            previous.handle.abort();
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action().await;

            // The action may have rescheduled this order; only remove the
            // entry if it is still ours.
            let mut guard = tasks.lock().await;
            if guard
                .get(&order_id)
                .is_some_and(|task| task.generation == generation)
            {
                guard.remove(&order_id);
            }
        });

        guard.insert(order_id, PendingTask { generation, handle });
        info!("Scheduled delayed action for order {}", order_id);
    }

    /// Cancel the pending action for an order, if any. Returns whether a
    /// task was actually cancelled.
    pub async fn cancel(&self, order_id: Uuid) -> bool {
        let mut guard = self.tasks.lock().await;

        match guard.remove(&order_id) {
            Some(task) => {
                task.handle.abort();
                info!("Cancelled delayed action for order {}", order_id);
                true
            }
            None => false,
        }
    }

    /// Number of currently pending actions
    pub async fn pending(&self) -> usize {
        self.tasks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn settle() {
        // Let spawned tasks run to completion under the paused clock.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_fires_after_delay() {
        let scheduler = OrderScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&fired);
        scheduler
            .schedule(Uuid::new_v4(), Duration::from_secs(30), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_suppresses_action() {
        let scheduler = OrderScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let order_id = Uuid::new_v4();

        let counter = Arc::clone(&fired);
        scheduler
            .schedule(order_id, Duration::from_secs(30), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(scheduler.cancel(order_id).await);

        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_without_pending_task_is_a_noop() {
        let scheduler = OrderScheduler::new();
        assert!(!scheduler.cancel(Uuid::new_v4()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_action() {
        let scheduler = OrderScheduler::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let order_id = Uuid::new_v4();

        let counter = Arc::clone(&first);
        scheduler
            .schedule(order_id, Duration::from_secs(30), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        let counter = Arc::clone(&second);
        scheduler
            .schedule(order_id, Duration::from_secs(30), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(scheduler.pending().await, 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_action_does_not_evict_its_replacement() {
        let scheduler = OrderScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let order_id = Uuid::new_v4();

        // The first action reschedules the same order, so its cleanup runs
        // after the replacement is already in the map.
        let inner = scheduler.clone();
        let counter = Arc::clone(&fired);
        scheduler
            .schedule(order_id, Duration::from_secs(30), move || async move {
                inner
                    .schedule(order_id, Duration::from_secs(30), move || async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .await;
            })
            .await;

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;

        // The replacement must still be tracked and cancellable.
        assert_eq!(scheduler.pending().await, 1);
        assert!(scheduler.cancel(order_id).await);

        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_orders_are_scheduled_independently() {
        let scheduler = OrderScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let cancelled_order = Uuid::new_v4();

        for _ in 0..2 {
            let counter = Arc::clone(&fired);
            scheduler
                .schedule(Uuid::new_v4(), Duration::from_secs(30), move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }

        let counter = Arc::clone(&fired);
        scheduler
            .schedule(cancelled_order, Duration::from_secs(30), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        scheduler.cancel(cancelled_order).await;

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
