//! Polling directory watcher.
//!
//! A single loop scans the watched tree on a fixed interval, diffs the new
//! snapshot against the last one and routes each change by content type to
//! handlers running on a worker pool.
//!
//! # Architecture
//!
//! ```text
//! WatchLoop (one task, cycles never overlap)
//!   scan ─► diff ─► dispatch
//!    |        |         |
//! Snapshot  SuppressionLedger  DispatchRegistry ─► JobSink (WorkerPool)
//!                 ▲                                   |
//!                 └──── mark(output path) ◄── FileHandler (jpeg, json, text, zip, deletion)
//! ```
//!
//! Handlers that write inside the watched tree mark their output in the
//! ledger first, so the next cycle drops the resulting event instead of
//! feeding it back into the pipeline.

mod content_type;
mod detector;
mod error;
mod event;
mod executor;
mod handler;
pub mod handlers;
pub mod registry;
mod snapshot;
mod suppression;
mod watch_loop;

pub use content_type::{ContentType, TypeResolver};
pub use detector::diff;
pub use error::{HandlerError, WatchError};
pub use event::{ChangeEvent, ChangeKind};
pub use executor::{HandlerSet, JobSink, WorkerPool};
pub use handler::{FileHandler, HandlerId, Job};
pub use registry::{DispatchOutcome, DispatchRegistry};
pub use snapshot::{Mtime, Snapshot, scan};
pub use suppression::{DEFAULT_SUPPRESSION_TTL, SuppressionLedger};
pub use watch_loop::{WatchLoop, WatchState};
