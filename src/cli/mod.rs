//! CLI module for SceneCut
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapters::AppConfig;
use crate::error::SceneCutResult;

pub mod args;
pub mod commands;

/// SceneCut
///
/// Detects scene cuts, splits videos into per-scene files and groups scenes
/// with a vision model. Progress streams to stdout as NDJSON; logs go to stderr.
#[derive(Parser)]
#[command(name = "scenecut")]
#[command(about = "SceneCut - scene detection, splitting and grouping with live progress")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Configuration file (default: scenecut.toml or config/scenecut.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Detect scenes and stream progress
    Analyze(args::AnalyzeArgs),
    /// Split a video into one file per scene
    Split(args::SplitArgs),
    /// Group scenes by visual similarity
    Group(args::GroupArgs),
}

impl Cli {
    /// Apply command-line overrides, the highest-precedence layer
    pub fn apply_overrides(&self, config: &mut AppConfig) -> SceneCutResult<()> {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.parse()?;
        }
        match &self.command {
            Commands::Analyze(args) => args.apply(config),
            Commands::Split(args) => args.apply(config),
            Commands::Group(args) => args.apply(config),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::LogFormat;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "scenecut",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "analyze",
            "--input",
            "in.mp4",
            "--threshold",
            "35",
            "--group",
        ]);
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.detector.threshold, 35.0);
        match cli.command {
            Commands::Analyze(args) => assert!(args.group),
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_split_args() {
        let cli = Cli::parse_from([
            "scenecut", "split", "-i", "in.mp4", "-s", "-", "--crf", "18",
        ]);
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config).unwrap();
        assert_eq!(config.splitter.profile.crf, 18);
        assert_eq!(config.splitter.profile.preset, "fast");
    }

    #[test]
    fn test_bad_log_format() {
        let cli = Cli::parse_from(["scenecut", "--log-format", "xml", "group", "-i", "a", "-s", "b"]);
        assert!(cli.apply_overrides(&mut AppConfig::default()).is_err());
    }
}
