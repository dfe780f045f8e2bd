//! Asynchronous job execution.
//!
//! The dispatcher only sees [`JobSink`]. [`WorkerPool`] is the in-process
//! implementation: jobs travel over an unbounded channel and each one runs
//! on its own tokio task, with a semaphore capping how many run at once.
//! Closing the pool stops intake but lets submitted jobs finish.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};

use super::HandlerError;
use super::handler::{FileHandler, HandlerId, Job};

/// Fire-and-forget submission of jobs.
pub trait JobSink: Send + Sync {
    fn submit(&self, job: Job);
}

/// Live handlers keyed by id.
#[derive(Clone, Default)]
pub struct HandlerSet {
    handlers: HashMap<HandlerId, Arc<dyn FileHandler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own id, replacing any previous one.
    pub fn with(mut self, handler: impl FileHandler + 'static) -> Self {
        self.insert(Arc::new(handler));
        self
    }

    pub fn insert(&mut self, handler: Arc<dyn FileHandler>) {
        self.handlers.insert(handler.id(), handler);
    }

    pub fn get(&self, id: &HandlerId) -> Option<Arc<dyn FileHandler>> {
        self.handlers.get(id).cloned()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<HandlerId> {
        let mut ids: Vec<_> = self.handlers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run one job to completion.
    pub async fn run(&self, job: &Job) -> Result<(), HandlerError> {
        let handler = self.get(&job.handler).ok_or_else(|| HandlerError::UnknownHandler {
            id: job.handler.to_string(),
        })?;
        handler.handle(job.kind, &job.path).await
    }
}

/// Channel-fed worker pool.
pub struct WorkerPool {
    tx: mpsc::UnboundedSender<Job>,
    driver: JoinHandle<()>,
}

impl WorkerPool {
    /// Start the pool on the current tokio runtime.
    pub fn start(handlers: HandlerSet, workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(workers.max(1)));
        let driver = tokio::spawn(drive(rx, Arc::new(handlers), permits));

        Self { tx, driver }
    }

    /// Stop accepting jobs and wait for submitted ones to finish.
    pub async fn shutdown(self) {
        let Self { tx, driver } = self;
        drop(tx);

        if let Err(e) = driver.await {
            tracing::error!("[executor] worker pool ended abnormally: {e}");
        }
    }
}

impl JobSink for WorkerPool {
    fn submit(&self, job: Job) {
        if self.tx.send(job).is_err() {
            tracing::error!("[executor] job dropped, worker pool is closed");
        }
    }
}

async fn drive(
    mut rx: mpsc::UnboundedReceiver<Job>,
    handlers: Arc<HandlerSet>,
    permits: Arc<Semaphore>,
) {
    let mut running = JoinSet::new();

    while let Some(job) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let handlers = handlers.clone();

        running.spawn(async move {
            let _permit = permit;
            crate::debug_event!(job.handler, "started", "{} {}", job.kind, job.path.display());

            if let Err(e) = handlers.run(&job).await {
                tracing::error!("[{}] handler error: {e}", job.handler);
            }
        });

        // Reap finished jobs so the set doesn't grow unbounded
        while let Some(res) = running.try_join_next() {
            log_join_error(res);
        }
    }

    while let Some(res) = running.join_next().await {
        log_join_error(res);
    }

    crate::debug_event!("executor", "drained");
}

fn log_join_error(res: Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        tracing::error!("[executor] job task failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::ChangeKind;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingHandler {
        id: &'static str,
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl FileHandler for CountingHandler {
        fn id(&self) -> HandlerId {
            HandlerId::new(self.id)
        }

        async fn handle(&self, _kind: ChangeKind, _path: &Path) -> Result<(), HandlerError> {
            tokio::time::sleep(self.delay).await;
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl FileHandler for FailingHandler {
        fn id(&self) -> HandlerId {
            HandlerId::new("failing")
        }

        async fn handle(&self, _kind: ChangeKind, path: &Path) -> Result<(), HandlerError> {
            Err(HandlerError::Decode {
                path: path.to_path_buf(),
                reason: "always fails".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains_submitted_jobs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handlers = HandlerSet::new().with(CountingHandler {
            id: "count",
            calls: calls.clone(),
            delay: Duration::from_millis(20),
        });

        let pool = WorkerPool::start(handlers, 2);
        for i in 0..5 {
            pool.submit(Job::new(
                HandlerId::new("count"),
                ChangeKind::Created,
                format!("/w/{i}.txt"),
            ));
        }
        pool.shutdown().await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_pool() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handlers = HandlerSet::new()
            .with(FailingHandler)
            .with(CountingHandler {
                id: "count",
                calls: calls.clone(),
                delay: Duration::ZERO,
            });

        let pool = WorkerPool::start(handlers, 1);
        pool.submit(Job::new(HandlerId::new("failing"), ChangeKind::Modified, "/w/a"));
        pool.submit(Job::new(HandlerId::new("missing"), ChangeKind::Modified, "/w/b"));
        pool.submit(Job::new(HandlerId::new("count"), ChangeKind::Modified, "/w/c"));
        pool.shutdown().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_handler_is_an_error() {
        let set = HandlerSet::new();
        let err = set
            .run(&Job::new(HandlerId::ZIP, ChangeKind::Created, "/w/a.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::UnknownHandler { .. }));
    }

    #[test]
    fn test_ids_sorted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let set = HandlerSet::new().with(FailingHandler).with(CountingHandler {
            id: "count",
            calls,
            delay: Duration::ZERO,
        });
        assert_eq!(set.ids(), vec![HandlerId::new("count"), HandlerId::new("failing")]);
    }
}
