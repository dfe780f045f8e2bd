pub mod cli;
pub mod config;
pub mod logging;
pub mod watcher;

pub use config::Settings;
pub use watcher::{
    ChangeEvent, ChangeKind, ContentType, DispatchRegistry, FileHandler, HandlerError, HandlerId,
    SuppressionLedger, TypeResolver, WatchError, WatchLoop, WatchState, WorkerPool,
};
