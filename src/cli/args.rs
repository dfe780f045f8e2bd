//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Polling directory watcher
#[derive(Parser, Debug)]
#[command(
    name = "pollwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Polling directory watcher",
    long_about = "Scan a directory on an interval and route new, changed and deleted files to content-type handlers.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ pollwatch init                  # Write .pollwatch/settings.toml\n  $ pollwatch watch                 # Watch the configured root\n  $ pollwatch watch ./inbox -i 0.5  # Watch a directory twice a second"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .pollwatch directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Watch a directory until interrupted
    #[command(
        about = "Scan a directory and dispatch file changes",
        after_help = "Examples:\n  pollwatch watch\n  pollwatch watch ./storage/app/private\n  pollwatch watch /srv/inbox --interval 0.25"
    )]
    Watch {
        /// Directory to watch (overrides config, created if missing)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Seconds between scans (overrides config)
        #[arg(short, long, value_name = "SECS")]
        interval: Option<f64>,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .pollwatch/settings.toml")]
    Config,
}
