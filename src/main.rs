use std::process::ExitCode;

use clap::Parser;
use pollwatch::cli::commands::{init, watch};
use pollwatch::cli::{Cli, Commands};
use pollwatch::config::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Init { force } = cli.command {
        return init::run_init(force);
    }

    let config = match Settings::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    pollwatch::logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Init { .. } => ExitCode::SUCCESS,
        Commands::Config => init::run_config(&config),
        Commands::Watch { path, interval } => watch::run_watch(&config, path, interval).await,
    }
}
