//! FFmpeg execution adapter
//!
//! Runs the ffmpeg executable for segment transcodes and single-frame grabs.
//! Only the exit status and, for grabs, stdout are relied upon.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::model::{TranscodeJob, TranscodeProfile};
use crate::error::{SceneCutError, SceneCutResult};
use crate::ports::{FrameGrabber, Transcoder};
use crate::utils::time::ffmpeg_seconds;

/// ffmpeg command-line adapter
#[derive(Debug, Clone)]
pub struct FfmpegCli {
    binary: PathBuf,
}

impl Default for FfmpegCli {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Fail early when the executable cannot be run
    pub fn ensure_available(&self) -> SceneCutResult<()> {
        let status = std::process::Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| SceneCutError::FFmpegInitError {
                message: format!("{} could not be started: {}", self.binary.display(), e),
            })?;
        if !status.success() {
            return Err(SceneCutError::FFmpegInitError {
                message: format!("{} -version exited with {}", self.binary.display(), status),
            });
        }
        Ok(())
    }

    /// Arguments for one segment transcode.
    ///
    /// Seeking before `-i` is fast; with re-encoding ffmpeg still drops the
    /// frames before the offset, so the segment starts cleanly.
    pub fn transcode_args(job: &TranscodeJob, profile: &TranscodeProfile) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-ss".to_string(),
            ffmpeg_seconds(job.start_offset),
            "-i".to_string(),
            job.input.to_string_lossy().into_owned(),
            "-t".to_string(),
            ffmpeg_seconds(job.duration),
            "-c:v".to_string(),
            profile.video_codec.clone(),
            "-preset".to_string(),
            profile.preset.clone(),
            "-crf".to_string(),
            profile.crf.to_string(),
            "-pix_fmt".to_string(),
            profile.pixel_format.clone(),
            "-c:a".to_string(),
            profile.audio_codec.clone(),
        ];
        if profile.faststart {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }
        if profile.threads > 0 {
            args.extend(["-threads".to_string(), profile.threads.to_string()]);
        }
        args.push(job.output.to_string_lossy().into_owned());
        args
    }

    /// Arguments for grabbing one JPEG frame to stdout
    pub fn thumbnail_args(input: &Path, at: f64, width: u32) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-ss".to_string(),
            ffmpeg_seconds(at),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-vf".to_string(),
            format!("scale={}:-1", width),
            "-f".to_string(),
            "image2pipe".to_string(),
            "-vcodec".to_string(),
            "mjpeg".to_string(),
            "-".to_string(),
        ]
    }
}

/// Last non-empty stderr line, for error messages
fn stderr_tail(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

impl Transcoder for FfmpegCli {
    fn transcode(&self, job: &TranscodeJob, profile: &TranscodeProfile) -> SceneCutResult<()> {
        let args = Self::transcode_args(job, profile);
        debug!("Running {} {}", self.binary.display(), args.join(" "));

        let output = std::process::Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| SceneCutError::Transcode {
                scene_number: job.scene_number,
                message: format!("could not start {}: {}", self.binary.display(), e),
            })?;

        if !output.status.success() {
            let detail = stderr_tail(&output);
            warn!("Transcode of scene {} failed: {}", job.scene_number, detail);
            return Err(SceneCutError::Transcode {
                scene_number: job.scene_number,
                message: format!("ffmpeg exited with {}: {}", output.status, detail),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FrameGrabber for FfmpegCli {
    async fn grab_frame(&self, input: &Path, at: f64, width: u32) -> SceneCutResult<Vec<u8>> {
        let args = Self::thumbnail_args(input, at, width);
        let output = tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SceneCutError::Thumbnail {
                at,
                message: format!("could not start {}: {}", self.binary.display(), e),
            })?;

        if !output.status.success() {
            return Err(SceneCutError::Thumbnail {
                at,
                message: format!("ffmpeg exited with {}: {}", output.status, stderr_tail(&output)),
            });
        }
        Ok(output.stdout)
    }
}
