//! Handler contract and the job type routed to handlers.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::HandlerError;
use super::event::ChangeKind;

/// Identifier a handler is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(Cow<'static, str>);

impl HandlerId {
    pub const JPEG: HandlerId = HandlerId(Cow::Borrowed("jpeg"));
    pub const JSON: HandlerId = HandlerId(Cow::Borrowed("json"));
    pub const TEXT: HandlerId = HandlerId(Cow::Borrowed("text"));
    pub const ZIP: HandlerId = HandlerId(Cow::Borrowed("zip"));
    pub const DELETION: HandlerId = HandlerId(Cow::Borrowed("deletion"));

    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandlerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Unit of work submitted to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub handler: HandlerId,
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl Job {
    pub fn new(handler: HandlerId, kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            handler,
            kind,
            path: path.into(),
        }
    }
}

/// A unit of business logic invoked for one change.
///
/// Implementations must tolerate duplicate invocations, and must mark any
/// path they are about to write in the suppression ledger first.
#[async_trait]
pub trait FileHandler: Send + Sync {
    /// Identifier used in the dispatch table.
    fn id(&self) -> HandlerId;

    /// Process one change.
    async fn handle(&self, kind: ChangeKind, path: &Path) -> Result<(), HandlerError>;
}
