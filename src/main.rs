//! SceneCut CLI
//!
//! Detects scene cuts in a video, splits it into one normalized file per
//! scene, and groups scenes by visual similarity with a local vision model.
//!
//! # Usage
//!
//! ```bash
//! scenecut analyze --input holiday.mov --threshold 27 > events.ndjson
//! tail -n 1 events.ndjson | scenecut split --input holiday.mov --scenes -
//! scenecut group --input holiday.mov --scenes scenes.json
//! ```
//!
//! Progress and results are written to stdout as newline-delimited JSON;
//! logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use scenecut_cli::adapters::AppConfig;
use scenecut_cli::cli::{commands, Cli, Commands};
use scenecut_cli::utils::logging::LoggingSystem;

/// Main entry point for the SceneCut CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Precedence: CLI > environment > file > defaults
    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config)
        .context("Invalid command-line option")?;
    config.validate().context("Invalid configuration")?;

    let logging = LoggingSystem::new(config.logging.clone());
    logging.initialize()?;
    logging.log_system_info();

    match cli.command {
        Commands::Analyze(args) => {
            info!("Executing analyze command");
            commands::analyze(args, &config).await?;
        }
        Commands::Split(args) => {
            info!("Executing split command");
            commands::split(args, &config).await?;
        }
        Commands::Group(args) => {
            info!("Executing group command");
            commands::group(args, &config).await?;
        }
    }

    Ok(())
}
