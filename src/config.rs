//! Configuration module for the polling watcher.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides (applied by the commands)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `POLLWATCH_` and use double
//! underscores to separate nested levels:
//! - `POLLWATCH_WATCHER__INTERVAL_SECS=0.5` sets `watcher.interval_secs`
//! - `POLLWATCH_EXECUTOR__WORKERS=2` sets `executor.workers`
//! - `POLLWATCH_LOGGING__DEFAULT=debug` sets `logging.default`

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::watcher::registry::default_routes;
use crate::watcher::{ContentType, HandlerId, WatchError};

/// Directory holding the settings file.
pub const CONFIG_DIR: &str = ".pollwatch";
/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "POLLWATCH_";
/// Longest accepted scan interval, one day.
pub const MAX_INTERVAL_SECS: f64 = 86_400.0;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Scan loop settings
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Worker pool settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Remote services used by handlers
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Per-handler tuning
    #[serde(default)]
    pub handlers: HandlersConfig,

    /// Content type → handler routing
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatcherConfig {
    /// Directory to watch, created on startup if missing
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Seconds between scans (fractional allowed)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,

    /// Lifetime of a self-write suppression entry
    #[serde(default = "default_suppression_ttl_ms")]
    pub suppression_ttl_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of handler jobs running at once
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointsConfig {
    /// JSON API returning `{"url": ...}` of a placeholder image
    #[serde(default = "default_placeholder_api")]
    pub placeholder_api: String,

    /// JSON API returning an array of paragraphs
    #[serde(default = "default_text_source")]
    pub text_source: String,

    /// Endpoint receiving JSON file contents
    #[serde(default = "default_json_sink")]
    pub json_sink: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HandlersConfig {
    /// JPEG re-encode quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DispatchConfig {
    /// Handler ids per content type, run in list order.
    /// An empty list disables a type.
    #[serde(default = "default_routes")]
    pub routes: IndexMap<ContentType, Vec<HandlerId>>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `pollwatch::watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 { 1 }
fn default_root() -> PathBuf { PathBuf::from("./storage/app/private") }
fn default_interval_secs() -> f64 { 1.0 }
fn default_suppression_ttl_ms() -> u64 { 2_000 }
fn default_workers() -> usize { num_cpus::get() }
fn default_placeholder_api() -> String { "https://meme-api.com/gimme".to_string() }
fn default_text_source() -> String {
    "https://baconipsum.com/api/?type=meat-and-filler".to_string()
}
fn default_json_sink() -> String { "https://fswatcher.requestcatcher.com".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_jpeg_quality() -> u8 { 85 }
fn default_log_level() -> String { "info".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watcher: WatcherConfig::default(),
            executor: ExecutorConfig::default(),
            endpoints: EndpointsConfig::default(),
            handlers: HandlersConfig::default(),
            dispatch: DispatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            interval_secs: default_interval_secs(),
            suppression_ttl_ms: default_suppression_ttl_ms(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            placeholder_api: default_placeholder_api(),
            text_source: default_text_source(),
            json_sink: default_json_sink(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for HandlersConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            routes: default_routes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl WatcherConfig {
    /// Scan interval. Out-of-range values fall back to the default;
    /// [`Settings::validate`] rejects them.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_interval_secs()))
    }

    pub fn suppression_ttl(&self) -> Duration {
        Duration::from_millis(self.suppression_ttl_ms)
    }

    /// TTL the ledger is built with.
    ///
    /// A mark has to outlive the gap between two scans or a handler's own
    /// write is reported once the mark expires. The configured TTL is raised
    /// to two intervals when it is shorter.
    pub fn effective_suppression_ttl(&self) -> Duration {
        let floor = self.interval().checked_mul(2).unwrap_or(Duration::MAX);
        self.suppression_ttl().max(floor)
    }
}

impl EndpointsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// Uses `path` when given, otherwise the nearest `.pollwatch/settings.toml`
    /// walking up from the current directory.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        let config_path = path
            .map(Path::to_path_buf)
            .or_else(Self::find_workspace_config)
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::load_from(config_path)
    }

    /// Load configuration from a specific file plus environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.pollwatch/settings.toml` in the current directory or an ancestor.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Check values that serde can't.
    pub fn validate(&self) -> Result<(), WatchError> {
        let interval = self.watcher.interval_secs;
        if !(interval > 0.0 && interval <= MAX_INTERVAL_SECS) {
            return Err(WatchError::Config {
                reason: format!(
                    "watcher.interval_secs must be within (0, {MAX_INTERVAL_SECS}], got {interval}"
                ),
            });
        }

        if self.executor.workers == 0 {
            return Err(WatchError::Config {
                reason: "executor.workers must be at least 1".to_string(),
            });
        }

        if !(1..=100).contains(&self.handlers.jpeg_quality) {
            return Err(WatchError::Config {
                reason: format!(
                    "handlers.jpeg_quality must be within 1..=100, got {}",
                    self.handlers.jpeg_quality
                ),
            });
        }

        Ok(())
    }

    /// Save current configuration to file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Write a default settings file under the current directory.
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
