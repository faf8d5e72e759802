//! Deferred Task Scheduler
//!
//! Runs keyed, cancellable background tasks on the tokio runtime. Token
//! eviction timers and settlement confirmations are registered here so their
//! owners can cancel them on shutdown instead of leaking timers.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

type TaskMap = Arc<Mutex<HashMap<String, (u64, AbortHandle)>>>;

/// Keyed scheduler for fire-and-forget tasks
pub struct Scheduler {
    tasks: TaskMap,
    next_id: AtomicU64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Run `task` once after `delay`.
    ///
    /// Scheduling a key that is already pending aborts the earlier task.
    /// Returns `false` when called outside a tokio runtime; nothing is
    /// scheduled in that case.
    pub fn schedule<F>(&self, key: impl Into<String>, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        let Ok(runtime) = Handle::try_current() else {
            tracing::debug!(task = %key, "No runtime available, task not scheduled");
            return false;
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tasks = Arc::clone(&self.tasks);
        let task_key = key.clone();

        // Registered before the task can finish and deregister itself.
        let mut pending = self.tasks.lock();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;

            let mut tasks = tasks.lock();
            if tasks.get(&task_key).is_some_and(|(current, _)| *current == id) {
                tasks.remove(&task_key);
            }
        });

        if let Some((_, previous)) = pending.insert(key, (id, handle.abort_handle())) {
            previous.abort();
        }
        true
    }

    /// Cancel a pending task. Returns whether one was pending.
    pub fn cancel(&self, key: &str) -> bool {
        match self.tasks.lock().remove(key) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a task is pending under `key`
    pub fn is_pending(&self, key: &str) -> bool {
        self.tasks.lock().contains_key(key)
    }

    /// Number of pending tasks
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Abort every pending task
    pub fn shutdown(&self) {
        let drained: Vec<_> = self.tasks.lock().drain().collect();
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "Cancelling scheduled tasks");
        }
        for (_, (_, handle)) in drained {
            handle.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_task_runs_after_delay() {
        let scheduler = Scheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        assert!(scheduler.schedule("tick", Duration::from_secs(3), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_pending("tick"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending("tick"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_task() {
        let scheduler = Scheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let counter = Arc::clone(&hits);
            scheduler.schedule("same", Duration::from_secs(1), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_everything() {
        let scheduler = Scheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for key in ["a", "b"] {
            let counter = Arc::clone(&hits);
            scheduler.schedule(key, Duration::from_secs(1), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        scheduler.shutdown();
        assert_eq!(scheduler.pending(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_runtime() {
        let scheduler = Scheduler::new();
        assert!(!scheduler.schedule("orphan", Duration::from_secs(1), async {}));
        assert_eq!(scheduler.pending(), 0);
    }
}
