//! The scan loop.
//!
//! Each cycle purges the ledger, scans the root, diffs against the previous
//! snapshot and dispatches the resulting events. The blocking part of a
//! cycle runs on the blocking pool and is awaited before the next tick, so
//! cycles never overlap.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use super::WatchError;
use super::content_type::TypeResolver;
use super::detector::{diff, tally};
use super::event::ChangeEvent;
use super::executor::JobSink;
use super::registry::DispatchRegistry;
use super::snapshot::{self, Snapshot};
use super::suppression::SuppressionLedger;

/// Lifecycle of a [`WatchLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Initializing,
    Idle,
    Scanning,
    Stopped,
    Failed,
}

pub struct WatchLoop {
    root: PathBuf,
    interval: Duration,
    previous: Snapshot,
    ledger: SuppressionLedger,
    registry: Arc<DispatchRegistry>,
    resolver: TypeResolver,
    sink: Arc<dyn JobSink>,
    state: WatchState,
}

impl WatchLoop {
    pub fn new(
        root: impl Into<PathBuf>,
        interval: Duration,
        ledger: SuppressionLedger,
        registry: Arc<DispatchRegistry>,
        sink: Arc<dyn JobSink>,
    ) -> Self {
        Self {
            root: root.into(),
            interval,
            previous: Snapshot::new(),
            ledger,
            registry,
            resolver: TypeResolver::new(),
            sink,
            state: WatchState::Initializing,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot the next cycle diffs against.
    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }

    /// Create the root if needed and take the baseline snapshot.
    ///
    /// Files already present are never reported.
    pub async fn bootstrap(&mut self) -> Result<(), WatchError> {
        match self.try_bootstrap().await {
            Ok(baseline) => {
                crate::log_event!(
                    "watcher",
                    "watching",
                    "{} ({} files, every {:?})",
                    self.root.display(),
                    baseline.len(),
                    self.interval
                );
                self.previous = baseline;
                self.state = WatchState::Idle;
                Ok(())
            }
            Err(e) => {
                self.state = WatchState::Failed;
                Err(e)
            }
        }
    }

    async fn try_bootstrap(&mut self) -> Result<Snapshot, WatchError> {
        let bootstrap_error = |path: &Path, reason: String| WatchError::Bootstrap {
            path: path.to_path_buf(),
            reason,
        };

        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            tokio::fs::create_dir_all(&self.root)
                .await
                .map_err(|e| bootstrap_error(&self.root, e.to_string()))?;
            crate::log_event!("watcher", "created root", "{}", self.root.display());
        }

        self.root = std::path::absolute(&self.root)
            .map_err(|e| bootstrap_error(&self.root, e.to_string()))?;

        let root = self.root.clone();
        tokio::task::spawn_blocking(move || snapshot::scan(&root))
            .await
            .map_err(|e| bootstrap_error(&self.root, e.to_string()))?
            .map_err(|e| bootstrap_error(&self.root, e.to_string()))
    }

    /// Run one scan cycle and return the events that were dispatched.
    ///
    /// A failed scan keeps the previous snapshot and returns the recoverable
    /// [`WatchError::ScanFailed`]. A panicking scan is fatal.
    pub async fn tick(&mut self) -> Result<Vec<ChangeEvent>, WatchError> {
        self.state = WatchState::Scanning;
        self.ledger.purge_expired(Instant::now());

        let root = self.root.clone();
        let previous = std::mem::take(&mut self.previous);
        let ledger = self.ledger.clone();
        let registry = self.registry.clone();
        let resolver = self.resolver.clone();
        let sink = self.sink.clone();

        let cycle = tokio::task::spawn_blocking(move || match snapshot::scan(&root) {
            Ok(current) => {
                let events = diff(&previous, &current, &ledger);
                for event in &events {
                    crate::log_event!("watcher", event.kind, "{}", event.path.display());
                    registry.dispatch(event, &resolver, sink.as_ref());
                }
                (current, Ok(events))
            }
            Err(e) => (previous, Err(e)),
        })
        .await;

        let (snapshot, result) = match cycle {
            Ok(cycle) => cycle,
            Err(e) => {
                self.state = WatchState::Failed;
                return Err(WatchError::LoopFatal {
                    reason: format!("scan task failed: {e}"),
                });
            }
        };

        self.previous = snapshot;
        self.state = WatchState::Idle;

        let (created, modified, deleted) = result.as_deref().map(tally).unwrap_or_default();
        if created + modified + deleted > 0 {
            crate::debug_event!(
                "watcher",
                "cycle",
                "{created} created, {modified} modified, {deleted} deleted"
            );
        }

        result
    }

    /// Bootstrap if needed, then scan every interval until `cancel` fires.
    ///
    /// Cancellation is only observed between cycles. Scan failures are
    /// logged and retried on the next tick.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), WatchError> {
        if self.state == WatchState::Initializing {
            self.bootstrap().await?;
        }

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately and the baseline is fresh
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.state = WatchState::Stopped;
                    crate::log_event!("watcher", "stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(_) => {}
                        Err(e) if e.is_recoverable() => {
                            tracing::error!("[watcher] scan failed, keeping snapshot: {e}");
                        }
                        Err(e) => {
                            self.state = WatchState::Failed;
                            return Err(e);
                        }
                    }
                }
            }
        }
    }
}
