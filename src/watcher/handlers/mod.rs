//! Built-in handlers.

mod archive;
mod deletion;
mod jpeg;
mod json;
mod text;

pub use archive::{ZipHandler, extraction_dir};
pub use deletion::{DeletionHandler, placeholder_path};
pub use jpeg::{JpegHandler, optimized_path};
pub use json::JsonHandler;
pub use text::TextHandler;

use crate::config::Settings;
use crate::watcher::{HandlerSet, SuppressionLedger};

/// Build the handler set from settings.
///
/// All handlers share one HTTP client and one ledger handle.
pub fn builtin(
    settings: &Settings,
    ledger: &SuppressionLedger,
    http: reqwest::Client,
) -> HandlerSet {
    let endpoints = &settings.endpoints;

    HandlerSet::new()
        .with(JpegHandler::new(ledger.clone(), settings.handlers.jpeg_quality))
        .with(JsonHandler::new(http.clone(), endpoints.json_sink.clone()))
        .with(TextHandler::new(
            http.clone(),
            endpoints.text_source.clone(),
            ledger.clone(),
        ))
        .with(ZipHandler::new(ledger.clone()))
        .with(DeletionHandler::new(
            http,
            endpoints.placeholder_api.clone(),
            ledger.clone(),
        ))
}

/// Shared skip log for handlers that only react to writes.
fn skip(handler: &str, path: &std::path::Path) {
    crate::log_event!(handler, "skipping", "{} is not created or modified", path.display());
}
