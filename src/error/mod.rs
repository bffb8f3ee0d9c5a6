//! Error handling module for SceneCut

use thiserror::Error;

/// Main error type for SceneCut operations
#[derive(Error, Debug)]
pub enum SceneCutError {
    /// Input file not found or inaccessible
    #[error("Input file not found: {path}")]
    InputFileNotFound { path: String },

    /// FFmpeg initialization error
    #[error("Failed to initialize FFmpeg: {message}")]
    FFmpegInitError { message: String },

    /// Source could not be opened or decoded
    #[error("Failed to decode video: {message}")]
    Decode { message: String },

    /// A segment transcode exited non-zero
    #[error("Transcode of scene {scene_number} failed: {message}")]
    Transcode { scene_number: u32, message: String },

    /// Thumbnail extraction failed or produced no data
    #[error("Thumbnail extraction at {at:.3}s failed: {message}")]
    Thumbnail { at: f64, message: String },

    /// Thumbnail grid could not be composed
    #[error("Failed to stitch grid: {message}")]
    Stitch { message: String },

    /// Vision model response could not be turned into groups
    #[error("Could not parse grouping response: {message}")]
    GroupParse { message: String },

    /// Vision model request failed
    #[error("Vision model request failed: {message}")]
    VisionModel { message: String },

    /// Worker terminated without reporting a result
    #[error("Worker terminated without reporting a result: {message}")]
    WorkerFault { message: String },

    /// Scene boundaries violate start < end
    #[error("Invalid scene {scene_number}: start ({start:.3}s) must be less than end ({end:.3}s)")]
    InvalidScene { scene_number: u32, start: f64, end: f64 },

    /// Configuration error
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// FFmpeg error
    #[error("FFmpeg error: {0}")]
    FFmpegError(#[from] ffmpeg_next::Error),
}

impl SceneCutError {
    /// Shorthand for decode failures
    pub fn decode(message: impl Into<String>) -> Self {
        SceneCutError::Decode { message: message.into() }
    }

    /// Shorthand for configuration failures
    pub fn config(message: impl Into<String>) -> Self {
        SceneCutError::Config { message: message.into() }
    }
}

/// Result type alias for SceneCut operations
pub type SceneCutResult<T> = std::result::Result<T, SceneCutError>;
