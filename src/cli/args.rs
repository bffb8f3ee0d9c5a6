//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::adapters::AppConfig;

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Content-difference threshold for a cut (default 27.0)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Minimum frames between two cuts
    #[arg(long)]
    pub min_scene_len: Option<u64>,

    /// Group detected scenes with the vision model before completing
    #[arg(long)]
    pub group: bool,
}

impl AnalyzeArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(threshold) = self.threshold {
            config.detector.threshold = threshold;
        }
        if let Some(frames) = self.min_scene_len {
            config.detector.min_scene_len = frames;
        }
    }
}

/// Arguments for the split command
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Scene list as JSON (a file path, or - for stdin)
    #[arg(short, long)]
    pub scenes: String,

    /// Output directory (default: input path without extension)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Constant Rate Factor (0-51)
    #[arg(long)]
    pub crf: Option<u8>,

    /// Encoding preset
    #[arg(long)]
    pub preset: Option<String>,
}

impl SplitArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(crf) = self.crf {
            config.splitter.profile.crf = crf;
        }
        if let Some(preset) = &self.preset {
            config.splitter.profile.preset = preset.clone();
        }
    }
}

/// Arguments for the group command
#[derive(Args, Debug)]
pub struct GroupArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Scene list as JSON (a file path, or - for stdin)
    #[arg(short, long)]
    pub scenes: String,

    /// Vision model name
    #[arg(long)]
    pub model: Option<String>,

    /// Ollama base URL
    #[arg(long)]
    pub endpoint: Option<String>,
}

impl GroupArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.grouping.model = model.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.grouping.endpoint = endpoint.clone();
        }
    }
}
