//! Log output for the watcher.
//!
//! Every detected, ignored or dropped change is reported as a compact
//! timestamped line on stderr. Levels come from the `[logging]` section of
//! the settings file; `RUST_LOG` overrides it at runtime.
//!
//! ```toml
//! [logging]
//! default = "info"
//!
//! [logging.modules]
//! "pollwatch::watcher" = "debug"
//! ```
//!
//! ```bash
//! RUST_LOG=debug pollwatch watch ./inbox
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

impl LoggingConfig {
    /// Filter directives in `EnvFilter` syntax, default level first.
    pub fn directives(&self) -> String {
        let mut modules: Vec<_> = self.modules.iter().collect();
        modules.sort();

        modules
            .into_iter()
            .fold(self.default.clone(), |mut acc, (module, level)| {
                acc.push_str(&format!(",{module}={level}"));
                acc
            })
    }
}

/// Install the global subscriber.
///
/// Only the first call takes effect, so tests and the binary can both call it.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::try_new(config.directives()).unwrap_or_else(|e| {
                eprintln!("Invalid logging config ({e}), falling back to 'info'");
                EnvFilter::new("info")
            })
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Initialize logging with default configuration.
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

/// Log an event with component context.
///
/// # Examples
/// ```ignore
/// log_event!("watcher", "created", "{}", path.display());
/// log_event!("zip", "extracted");
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-only event logging.
///
/// # Examples
/// ```ignore
/// debug_event!("ledger", "marked", "{}", path.display());
/// ```
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_include_modules() {
        let mut config = LoggingConfig::default();
        config
            .modules
            .insert("pollwatch::watcher".to_string(), "debug".to_string());

        assert_eq!(config.directives(), "info,pollwatch::watcher=debug");
    }

    #[test]
    fn test_default_directives() {
        assert_eq!(LoggingConfig::default().directives(), "info");
    }
}
