//! Error types for the polling watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Cannot scan {path}: {reason}")]
    ScanFailed { path: PathBuf, reason: String },

    #[error("Failed to start watching {path}: {reason}")]
    Bootstrap { path: PathBuf, reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Watch loop aborted: {reason}")]
    LoopFatal { reason: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

impl WatchError {
    /// Whether the error comes from a single scan and the loop may retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WatchError::ScanFailed { .. })
    }
}

/// Errors raised by handlers while processing a job.
///
/// These never leave the worker pool; they are logged per job.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request to {url} failed: {reason}")]
    Remote { url: String, reason: String },

    #[error("Cannot decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Archive error for {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    #[error("No handler registered under id '{id}'")]
    UnknownHandler { id: String },
}

impl HandlerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HandlerError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn remote(url: impl Into<String>, reason: impl ToString) -> Self {
        HandlerError::Remote {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
