// Ports - Interface definitions (contracts)

use std::path::Path;

use async_trait::async_trait;

use crate::domain::model::*;
use crate::error::SceneCutResult;

/// Port for sequential frame decoding
pub trait FrameSource {
    /// Metadata reported when the source was opened
    fn info(&self) -> &StreamInfo;

    /// Next frame in source order, `None` at end of stream
    fn read_next_frame(&mut self) -> SceneCutResult<Option<Frame>>;
}

/// Port for segment transcoding.
///
/// Blocking: callers run it on a worker thread.
pub trait Transcoder: Send + Sync {
    /// Produce a playable file at `job.output` or fail
    fn transcode(&self, job: &TranscodeJob, profile: &TranscodeProfile) -> SceneCutResult<()>;
}

/// Port for single-frame extraction
#[async_trait]
pub trait FrameGrabber: Send + Sync {
    /// Encoded image of the frame at `at` seconds, scaled to `width` with preserved aspect
    async fn grab_frame(&self, input: &Path, at: f64, width: u32) -> SceneCutResult<Vec<u8>>;
}

/// Port for vision-model queries
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send one prompt with one image, returning the model's text reply
    async fn query(&self, prompt: &str, image: &[u8]) -> SceneCutResult<String>;

    /// Model name for logging
    fn name(&self) -> &str;
}

/// Sink for live progress telemetry
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// Sink that discards progress
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn report(&self, _update: ProgressUpdate) {}
}
