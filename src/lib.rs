//! SceneCut Library
//!
//! Content-based scene detection, per-scene splitting and vision-model scene
//! grouping, with long-running jobs relayed as ordered progress event streams.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::model::{AnalysisReport, ProgressEvent, ProgressUpdate, Scene, SplitReport};
pub use error::{SceneCutError, SceneCutResult};

/// Initialize SceneCut library
pub fn init() -> SceneCutResult<()> {
    ffmpeg_next::init().map_err(|e| SceneCutError::FFmpegInitError {
        message: e.to_string(),
    })?;

    Ok(())
}
