//! Scene splitting into normalized per-scene files

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::domain::model::{ProgressUpdate, Scene, TranscodeJob, TranscodeProfile};
use crate::error::{SceneCutError, SceneCutResult};
use crate::ports::{ProgressSink, Transcoder};
use crate::utils::path::segment_file_name;
use crate::utils::percent_of;

/// Frame duration used when the source frame rate is unknown
pub const FALLBACK_FRAME_DURATION: f64 = 0.033;

/// Splits a video into one re-encoded file per scene
pub struct VideoSplitter {
    transcoder: Arc<dyn Transcoder>,
    profile: TranscodeProfile,
}

impl VideoSplitter {
    pub fn new(transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            transcoder,
            profile: TranscodeProfile::default(),
        }
    }

    /// Override the output profile
    pub fn with_profile(mut self, profile: TranscodeProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn profile(&self) -> &TranscodeProfile {
        &self.profile
    }

    /// Seek offset for scene `index`.
    ///
    /// Every scene after the first starts half a frame past its cut so the
    /// decoder never lands on the last frame of the previous scene.
    pub fn adjusted_start(index: usize, scene: &Scene, frame_rate: Option<f64>) -> f64 {
        if index == 0 {
            return scene.start;
        }
        let frame_duration = frame_rate
            .filter(|fps| *fps > 0.0)
            .map(|fps| 1.0 / fps)
            .unwrap_or(FALLBACK_FRAME_DURATION);
        scene.start + 0.5 * frame_duration
    }

    /// Build the transcode jobs for `scenes` without running them
    pub fn plan_jobs(
        &self,
        input: &Path,
        frame_rate: Option<f64>,
        scenes: &[Scene],
        output_dir: &Path,
    ) -> SceneCutResult<Vec<TranscodeJob>> {
        scenes
            .iter()
            .enumerate()
            .map(|(i, scene)| {
                scene.validate()?;
                Ok(TranscodeJob {
                    input: input.to_path_buf(),
                    start_offset: Self::adjusted_start(i, scene, frame_rate),
                    duration: scene.duration(),
                    output: output_dir.join(segment_file_name(input, i, &self.profile.container)),
                    scene_number: scene.scene_number,
                })
            })
            .collect()
    }

    /// Transcode every scene in order, stopping at the first failure.
    ///
    /// Files already written before a failure stay on disk.
    pub fn split(
        &self,
        input: &Path,
        frame_rate: Option<f64>,
        scenes: &[Scene],
        output_dir: &Path,
        sink: &dyn ProgressSink,
    ) -> SceneCutResult<Vec<PathBuf>> {
        if !input.exists() {
            return Err(SceneCutError::InputFileNotFound {
                path: input.display().to_string(),
            });
        }

        let jobs = self.plan_jobs(input, frame_rate, scenes, output_dir)?;
        std::fs::create_dir_all(output_dir)?;

        info!("Splitting {} scenes into {}", jobs.len(), output_dir.display());
        let started = Instant::now();
        let total = jobs.len() as u64;
        let mut files = Vec::with_capacity(jobs.len());

        for (i, job) in jobs.iter().enumerate() {
            debug!(
                "Scene {}: offset {:.3}s, duration {:.3}s -> {}",
                job.scene_number,
                job.start_offset,
                job.duration,
                job.output.display()
            );
            self.transcoder.transcode(job, &self.profile)?;
            files.push(job.output.clone());

            let done = i as u64 + 1;
            let elapsed = started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 { done as f64 / elapsed } else { 0.0 };
            sink.report(ProgressUpdate {
                percent: percent_of(done, total),
                fps: 0.0,
                eta_seconds: if rate > 0.0 { (total - done) as f64 / rate } else { 0.0 },
                scenes_so_far: done as u32,
            });
        }

        if jobs.is_empty() {
            sink.report(ProgressUpdate::percent_only(100));
        }

        info!(
            "Split {} scenes in {:.2}s",
            files.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(files)
    }
}
