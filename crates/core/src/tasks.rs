//! Bounded background work with awaitable, cancellable handles.
//!
//! Blocking calls (probing the executable, HTTP downloads, waiting on a
//! game process) run here so the UI task never stalls. Workers never touch
//! UI state; they hand results back through the handle or a completion
//! callback.

use std::{future::Future, sync::Arc};

use tokio::{
    sync::{watch, Semaphore},
    task::JoinHandle,
};
use tracing::debug;

/// Cooperative cancellation flag shared between a handle and its task.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    /// A fresh, untripped token.
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Trip the token.
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }

    /// Whether the token has been tripped.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once the token is tripped.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a job submitted to a [`TaskPool`].
#[derive(Debug)]
pub struct TaskHandle<T> {
    join: JoinHandle<Option<T>>,
    token: CancelToken,
}

impl<T> TaskHandle<T> {
    /// Ask the job to stop. A job that already finished keeps its result.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token observed by the job.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Whether the job has completed, been cancelled or panicked.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the job. `None` when it was cancelled or panicked.
    pub async fn wait(self) -> Option<T> {
        match self.join.await {
            Ok(value) => value,
            Err(err) => {
                debug!(%err, "background task ended abnormally");
                None
            }
        }
    }
}

/// Runs at most `limit` jobs at a time on the tokio runtime.
#[derive(Debug, Clone)]
pub struct TaskPool {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl TaskPool {
    /// Pool allowing `limit` concurrent jobs (at least one).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Number of jobs currently holding a slot.
    pub fn running(&self) -> usize {
        self.limit - self.permits.available_permits()
    }

    /// Submit a job. It starts once a slot is free and stops early if the
    /// handle is cancelled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, T>(&self, job: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let token = CancelToken::new();
        let task_token = token.clone();
        let permits = Arc::clone(&self.permits);
        let join = tokio::spawn(async move {
            let _permit = tokio::select! {
                permit = permits.acquire_owned() => permit.ok()?,
                _ = task_token.cancelled() => return None,
            };
            tokio::select! {
                value = job => Some(value),
                _ = task_token.cancelled() => None,
            }
        });
        TaskHandle { join, token }
    }

    /// Submit a job and run `on_complete` with its result on the worker.
    /// The callback is skipped when the job is cancelled.
    pub fn spawn_with<F, T, C>(&self, job: F, on_complete: C) -> TaskHandle<()>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        self.spawn(async move {
            let value = job.await;
            on_complete(value);
        })
    }

    /// Like [`TaskPool::spawn_with`], but the job starts immediately and never
    /// holds a slot. For long waits, such as a running game, that would
    /// otherwise starve bounded work.
    pub fn spawn_unbounded<F, T, C>(&self, job: F, on_complete: C) -> TaskHandle<()>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        let token = CancelToken::new();
        let task_token = token.clone();
        let join = tokio::spawn(async move {
            tokio::select! {
                value = job => {
                    on_complete(value);
                    Some(())
                }
                _ = task_token.cancelled() => None,
            }
        });
        TaskHandle { join, token }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn handle_returns_value() {
        let pool = TaskPool::new(2);
        let handle = pool.spawn(async { 21 * 2 });
        assert_eq!(handle.wait().await, Some(42));
    }

    #[tokio::test]
    async fn cancelled_job_yields_none() {
        let pool = TaskPool::new(1);
        let (release, blocker) = oneshot::channel::<()>();
        let first = pool.spawn(async move {
            let _ = blocker.await;
            1
        });
        let second = pool.spawn(async { 2 });
        second.cancel();
        assert!(second.token().is_cancelled());
        assert_eq!(second.wait().await, None);

        let _ = release.send(());
        assert_eq!(first.wait().await, Some(1));
    }

    #[tokio::test]
    async fn running_jobs_never_exceed_limit() {
        let pool = TaskPool::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                pool.spawn(async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.wait().await, Some(()));
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.running(), 0);
    }

    #[tokio::test]
    async fn completion_callback_receives_result() {
        let pool = TaskPool::new(1);
        let (sender, receiver) = oneshot::channel();
        let handle = pool.spawn_with(async { "done" }, move |value| {
            let _ = sender.send(value);
        });
        handle.wait().await;
        assert_eq!(receiver.await.ok(), Some("done"));
    }

    #[tokio::test]
    async fn unbounded_job_leaves_slots_free() {
        let pool = TaskPool::new(1);
        let (release, session) = oneshot::channel::<()>();
        let (sender, finished) = oneshot::channel();
        let long = pool.spawn_unbounded(
            async move {
                let _ = session.await;
                "exited"
            },
            move |value| {
                let _ = sender.send(value);
            },
        );

        let quick = pool.spawn(async { 7 });
        let done = tokio::time::timeout(Duration::from_secs(1), quick.wait()).await;
        assert_eq!(done.ok().flatten(), Some(7));
        assert!(!long.is_finished());
        assert_eq!(pool.running(), 0);

        let _ = release.send(());
        assert_eq!(long.wait().await, Some(()));
        assert_eq!(finished.await.ok(), Some("exited"));
    }
}
