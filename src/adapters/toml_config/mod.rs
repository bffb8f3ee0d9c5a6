// TOML config adapter - Layered configuration from TOML files and environment

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::TranscodeProfile;
use crate::engine::detector::{
    DEFAULT_MIN_SCENE_LEN, DEFAULT_PROGRESS_INTERVAL, DEFAULT_THRESHOLD,
    DEFAULT_WORKING_RESOLUTION,
};
use crate::engine::grouper::{DEFAULT_BATCH_SIZE, DEFAULT_SCRATCH_DIR};
use crate::engine::progress::DEFAULT_POLL_INTERVAL;
use crate::engine::thumbnail::{DEFAULT_OFFSET_SECONDS, DEFAULT_WIDTH};
use crate::error::{SceneCutError, SceneCutResult};
use crate::output::grid::{DEFAULT_COLUMNS, MAX_CELLS};
use crate::utils::logging::LoggingConfig;

/// Files searched, in order, when no config path is given
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["scenecut.toml", "config/scenecut.toml"];

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "SCENECUT_";

/// Scene detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub threshold: f64,
    /// Frames that must pass between two cuts
    pub min_scene_len: u64,
    /// Longest frame side scored, in pixels
    pub working_resolution: u32,
    /// Frames between progress updates
    pub progress_interval: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_scene_len: DEFAULT_MIN_SCENE_LEN,
            working_resolution: DEFAULT_WORKING_RESOLUTION,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Segment splitting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SplitterConfig {
    #[serde(flatten)]
    pub profile: TranscodeProfile,
}

/// Thumbnail extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub width: u32,
    /// Seconds added to every requested timestamp
    pub offset: f64,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            offset: DEFAULT_OFFSET_SECONDS,
        }
    }
}

/// Vision-model grouping settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    pub batch_size: usize,
    pub columns: u32,
    pub model: String,
    /// Ollama base URL
    pub endpoint: String,
    pub timeout_secs: u64,
    pub scratch_dir: PathBuf,
    /// TrueType font for grid labels; bitmap digits when unset
    pub label_font: Option<PathBuf>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            columns: DEFAULT_COLUMNS,
            model: "llama3.2-vision".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            timeout_secs: 300,
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            label_font: None,
        }
    }
}

/// Progress relay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub poll_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl BridgeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// ffmpeg executable used for transcoding and thumbnails
    pub ffmpeg: String,
    pub detector: DetectorConfig,
    pub splitter: SplitterConfig,
    pub thumbnails: ThumbnailConfig,
    pub grouping: GroupingConfig,
    pub bridge: BridgeConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            detector: DetectorConfig::default(),
            splitter: SplitterConfig::default(),
            thumbnails: ThumbnailConfig::default(),
            grouping: GroupingConfig::default(),
            bridge: BridgeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then a TOML file, then `SCENECUT_*` environment overrides.
    ///
    /// An explicit `path` must exist; otherwise the default locations are
    /// searched and skipped silently when absent.
    pub fn load(path: Option<&Path>) -> SceneCutResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match DEFAULT_CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
                Some(found) => Self::from_file(found)?,
                None => {
                    debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML file
    pub fn from_file(path: &Path) -> SceneCutResult<Self> {
        if !path.exists() {
            return Err(SceneCutError::config(format!(
                "Config file does not exist: {}",
                path.display()
            )));
        }
        info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> SceneCutResult<Self> {
        toml::from_str(content)
            .map_err(|e| SceneCutError::config(format!("Failed to parse TOML config: {}", e)))
    }

    /// Apply `SCENECUT_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> SceneCutResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut overrides = 0;
        let mut hit = |name: &str, value: &str| {
            debug!("Environment override: {}{} = {}", ENV_PREFIX, name, value);
            overrides += 1;
        };

        if let Some(v) = var("FFMPEG") {
            hit("FFMPEG", &v);
            self.ffmpeg = v;
        }
        if let Some(v) = var("THRESHOLD") {
            hit("THRESHOLD", &v);
            self.detector.threshold = parse_env("THRESHOLD", &v)?;
        }
        if let Some(v) = var("MIN_SCENE_LEN") {
            hit("MIN_SCENE_LEN", &v);
            self.detector.min_scene_len = parse_env("MIN_SCENE_LEN", &v)?;
        }
        if let Some(v) = var("CRF") {
            hit("CRF", &v);
            self.splitter.profile.crf = parse_env("CRF", &v)?;
        }
        if let Some(v) = var("PRESET") {
            hit("PRESET", &v);
            self.splitter.profile.preset = v;
        }
        if let Some(v) = var("BATCH_SIZE") {
            hit("BATCH_SIZE", &v);
            self.grouping.batch_size = parse_env("BATCH_SIZE", &v)?;
        }
        if let Some(v) = var("MODEL") {
            hit("MODEL", &v);
            self.grouping.model = v;
        }
        if let Some(v) = var("OLLAMA_URL") {
            hit("OLLAMA_URL", &v);
            self.grouping.endpoint = v;
        }
        if let Some(v) = var("SCRATCH_DIR") {
            hit("SCRATCH_DIR", &v);
            self.grouping.scratch_dir = PathBuf::from(v);
        }
        if let Some(v) = var("LABEL_FONT") {
            hit("LABEL_FONT", &v);
            self.grouping.label_font = Some(PathBuf::from(v));
        }
        if let Some(v) = var("POLL_MS") {
            hit("POLL_MS", &v);
            self.bridge.poll_interval_ms = parse_env("POLL_MS", &v)?;
        }
        if let Some(v) = var("LOG_LEVEL") {
            hit("LOG_LEVEL", &v);
            self.logging.level = v;
        }
        if let Some(v) = var("LOG_FORMAT") {
            hit("LOG_FORMAT", &v);
            self.logging.format = v.parse()?;
        }

        if overrides > 0 {
            debug!("Applied {} environment overrides", overrides);
        }
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> SceneCutResult<()> {
        if !self.detector.threshold.is_finite() {
            return Err(SceneCutError::config(format!(
                "Threshold must be a finite number, got {}",
                self.detector.threshold
            )));
        }
        if self.detector.working_resolution == 0 {
            return Err(SceneCutError::config("Working resolution cannot be zero"));
        }
        if self.detector.progress_interval == 0 {
            return Err(SceneCutError::config("Progress interval cannot be zero"));
        }
        if self.splitter.profile.crf > 51 {
            return Err(SceneCutError::config("CRF value cannot exceed 51"));
        }
        if self.splitter.profile.container.is_empty() {
            return Err(SceneCutError::config("Output container cannot be empty"));
        }
        if self.thumbnails.width == 0 {
            return Err(SceneCutError::config("Thumbnail width cannot be zero"));
        }
        if !(1..=MAX_CELLS).contains(&self.grouping.batch_size) {
            return Err(SceneCutError::config(format!(
                "Batch size must be between 1 and {}, got {}",
                MAX_CELLS, self.grouping.batch_size
            )));
        }
        if self.grouping.columns == 0 {
            return Err(SceneCutError::config("Grid columns cannot be zero"));
        }
        if self.bridge.poll_interval_ms == 0 {
            return Err(SceneCutError::config("Poll interval cannot be zero"));
        }
        self.logging.validate()
    }
}

fn parse_env<T>(name: &str, value: &str) -> SceneCutResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        SceneCutError::config(format!("Invalid value for {}{}: {}", ENV_PREFIX, name, e))
    })
}
