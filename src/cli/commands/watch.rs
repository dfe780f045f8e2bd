//! Watch command.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::watcher::{DispatchRegistry, SuppressionLedger, WatchLoop, WorkerPool, handlers};

/// Run the watch command until Ctrl+C.
///
/// CLI overrides replace the configured root and interval.
pub async fn run_watch(
    config: &Settings,
    path: Option<PathBuf>,
    interval: Option<f64>,
) -> ExitCode {
    let mut settings = config.clone();
    if let Some(path) = path {
        settings.watcher.root = path;
    }
    if let Some(interval) = interval {
        settings.watcher.interval_secs = interval;
    }

    let (mut watch_loop, pool) = match start(&settings).await {
        Ok(started) => started,
        Err(e) => {
            eprintln!("pollwatch could not start: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("Received shutdown signal");
                signal.cancel();
            }
            Err(e) => tracing::error!("[watcher] cannot listen for Ctrl+C: {e}"),
        }
    });

    let result = watch_loop.run(cancel).await;

    // The loop holds the other reference to the pool
    drop(watch_loop);
    match Arc::try_unwrap(pool) {
        Ok(pool) => pool.shutdown().await,
        Err(_) => tracing::warn!("[executor] pool still shared, not waiting for jobs"),
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pollwatch error while running: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Build every component and take the baseline snapshot.
async fn start(settings: &Settings) -> anyhow::Result<(WatchLoop, Arc<WorkerPool>)> {
    settings.validate()?;

    let http = reqwest::Client::builder()
        .timeout(settings.endpoints.timeout())
        .build()
        .context("failed to build HTTP client")?;

    let ttl = settings.watcher.effective_suppression_ttl();
    if ttl > settings.watcher.suppression_ttl() {
        crate::debug_event!("ledger", "ttl raised", "{ttl:?} to cover the scan interval");
    }
    let ledger = SuppressionLedger::with_ttl(ttl);
    let handlers = handlers::builtin(settings, &ledger, http);

    let registry = DispatchRegistry::from_routes(settings.dispatch.routes.clone(), &handlers.ids())
        .context("invalid dispatch routes")?;
    for (tag, ids) in registry.routes() {
        let ids: Vec<_> = ids.iter().map(|id| id.as_str()).collect();
        crate::debug_event!("dispatch", "route", "{tag} -> [{}]", ids.join(", "));
    }

    let pool = Arc::new(WorkerPool::start(handlers, settings.executor.workers));

    let mut watch_loop = WatchLoop::new(
        settings.watcher.root.clone(),
        settings.watcher.interval(),
        ledger,
        Arc::new(registry),
        pool.clone(),
    );
    watch_loop.bootstrap().await?;

    Ok((watch_loop, pool))
}
