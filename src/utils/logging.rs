//! Logging configuration and subscriber setup
//!
//! Logs always go to stderr: stdout is reserved for the NDJSON event stream.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{SceneCutError, SceneCutResult};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = SceneCutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(SceneCutError::config(format!(
                "Invalid log format: {}. Valid formats: pretty, compact, json",
                other
            ))),
        }
    }
}

/// Logging configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Include target module information
    pub target: bool,
    /// Include thread ids
    pub thread: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            target: false,
            thread: false,
        }
    }
}

impl LoggingConfig {
    /// Reject levels tracing does not know
    pub fn validate(&self) -> SceneCutResult<()> {
        self.level
            .parse::<tracing::Level>()
            .map(|_| ())
            .map_err(|_| {
                SceneCutError::config(format!(
                    "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                    self.level
                ))
            })
    }
}

/// Logging system manager
pub struct LoggingSystem {
    config: LoggingConfig,
}

impl LoggingSystem {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    /// Install the global subscriber. `RUST_LOG` takes precedence over the configured level.
    pub fn initialize(&self) -> SceneCutResult<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.config.level))
            .map_err(|e| SceneCutError::config(format!("Invalid log filter: {}", e)))?;

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(self.config.target)
            .with_thread_ids(self.config.thread);

        let result = match self.config.format {
            LogFormat::Pretty => builder.pretty().try_init(),
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        result.map_err(|e| SceneCutError::config(format!("Failed to install logger: {}", e)))?;

        tracing::debug!("Logging initialized with level {}", self.config.level);
        Ok(())
    }

    /// Log build and platform information
    pub fn log_system_info(&self) {
        tracing::info!("SceneCut {}", env!("CARGO_PKG_VERSION"));
        tracing::debug!("Platform: {}", std::env::consts::OS);
        tracing::debug!("Output format: {:?}", self.config.format);
    }
}
