// Domain models - Core types and data structures

use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{SceneCutError, SceneCutResult};
use crate::utils::time::format_seconds;

/// A contiguous time interval between two cuts (or stream boundaries)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// 1-based position in the detection run
    pub scene_number: u32,
    /// Semantic group, filled in by the grouper
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u32>,
}

impl Scene {
    pub fn new(start: f64, end: f64, scene_number: u32) -> Self {
        Self { start, end, scene_number, group_id: None }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Temporal midpoint, used for representative thumbnails
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    /// Check the `start < end` invariant
    pub fn validate(&self) -> SceneCutResult<()> {
        if !(self.start < self.end) || self.start < 0.0 {
            return Err(SceneCutError::InvalidScene {
                scene_number: self.scene_number,
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scene {} [{} - {}]",
            self.scene_number,
            format_seconds(self.start),
            format_seconds(self.end)
        )?;
        if let Some(group) = self.group_id {
            write!(f, " group {}", group)?;
        }
        Ok(())
    }
}

/// Turn an ordered boundary list into scenes numbered from 1.
///
/// Adjacent pairs become scenes; degenerate pairs (equal timestamps) are dropped
/// and the remaining scenes are renumbered so numbering stays gapless.
pub fn scenes_from_boundaries(boundaries: &[f64]) -> Vec<Scene> {
    boundaries
        .windows(2)
        .filter(|pair| pair[0] < pair[1])
        .enumerate()
        .map(|(i, pair)| Scene::new(pair[0], pair[1], i as u32 + 1))
        .collect()
}

/// Metadata reported by a frame source when it is opened
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// Frames per second
    pub frame_rate: f64,
    /// Total frames, if the container knows it
    pub frame_count: Option<u64>,
    /// Native width in pixels
    pub width: u32,
    /// Native height in pixels
    pub height: u32,
}

impl StreamInfo {
    /// Duration of one frame in seconds
    pub fn frame_duration(&self) -> Option<f64> {
        if self.frame_rate > 0.0 {
            Some(1.0 / self.frame_rate)
        } else {
            None
        }
    }
}

/// One decoded frame in source order
#[derive(Debug, Clone)]
pub struct Frame {
    /// 0-based position in the stream
    pub index: u64,
    /// RGB pixels at native resolution
    pub image: RgbImage,
}

/// Live telemetry from a running job
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Completion percentage (0-100)
    #[serde(rename = "value")]
    pub percent: u8,
    /// Processing rate in frames per second
    pub fps: f64,
    /// Estimated seconds remaining
    #[serde(rename = "eta")]
    pub eta_seconds: f64,
    /// Scenes found so far
    #[serde(rename = "scenes")]
    pub scenes_so_far: u32,
}

impl ProgressUpdate {
    /// Progress with no rate information
    pub fn percent_only(percent: u8) -> Self {
        Self {
            percent: percent.min(100),
            fps: 0.0,
            eta_seconds: 0.0,
            scenes_so_far: 0,
        }
    }
}

/// Event relayed from a job to its consumer.
///
/// Serializes to the NDJSON record shapes `{"type":"progress",...}`,
/// `{"type":"complete",...payload}` and `{"type":"error","message":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent<T> {
    Progress(ProgressUpdate),
    Complete(T),
    Error { message: String },
}

impl<T> ProgressEvent<T> {
    /// Terminal events end a job's stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Progress(_))
    }
}

/// Result payload of a detection job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub video_path: String,
    pub scenes: Vec<Scene>,
}

/// Result payload of a split job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitReport {
    pub files: Vec<String>,
    pub output_dir: String,
}

/// Fixed output profile every segment is re-encoded to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeProfile {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub pixel_format: String,
    /// Container extension of the output files
    pub container: String,
    /// Move the moov atom to the front for progressive download
    pub faststart: bool,
    /// Encoder threads (0 lets the encoder decide)
    pub threads: usize,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 22,
            audio_codec: "aac".to_string(),
            pixel_format: "yuv420p".to_string(),
            container: "mp4".to_string(),
            faststart: true,
            threads: 0,
        }
    }
}

/// One segment transcode invocation
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    pub input: PathBuf,
    /// Seek offset in seconds (already nudged past the cut)
    pub start_offset: f64,
    /// Segment length in seconds
    pub duration: f64,
    pub output: PathBuf,
    pub scene_number: u32,
}

/// A grid batch: consecutive scene indices plus their stitched thumbnail grid
#[derive(Debug, Clone)]
pub struct Batch {
    /// 0-based global scene indices, in grid order
    pub indices: Vec<usize>,
    /// Encoded grid image
    pub stitched_image: Vec<u8>,
}

impl Batch {
    /// Split `scene_count` scenes into consecutive ranges of at most `batch_size`
    pub fn plan(scene_count: usize, batch_size: usize) -> Vec<Range<usize>> {
        let batch_size = batch_size.max(1);
        (0..scene_count)
            .step_by(batch_size)
            .map(|start| start..(start + batch_size).min(scene_count))
            .collect()
    }

    /// Map a 1-based grid label to a global scene index
    pub fn global_index(&self, local: i64) -> Option<usize> {
        if local < 1 {
            return None;
        }
        self.indices.get((local - 1) as usize).copied()
    }
}

/// Batch-local grouping decoded from one model response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupAssignment {
    /// (1-based local index, 0-based batch-local group number)
    pub entries: Vec<(usize, usize)>,
    /// Number of groups the model declared
    pub group_count: usize,
}

impl GroupAssignment {
    /// Build from decoded sub-lists, keeping only integer indices within `1..=batch_len`
    pub fn from_groups(groups: &[Vec<serde_json::Value>], batch_len: usize) -> Self {
        let mut entries = Vec::new();
        for (group, members) in groups.iter().enumerate() {
            for member in members {
                match member.as_i64() {
                    Some(local) if local >= 1 && (local as usize) <= batch_len => {
                        entries.push((local as usize, group));
                    }
                    _ => tracing::debug!("Ignoring grid index {} in group {}", member, group + 1),
                }
            }
        }
        Self {
            entries,
            group_count: groups.len(),
        }
    }

    /// Write global group ids into `scenes` starting at `next_group_id`.
    ///
    /// Returns the next unused id; one id is consumed per declared group.
    pub fn merge_into(&self, scenes: &mut [Scene], batch: &Batch, next_group_id: u32) -> u32 {
        for &(local, group) in &self.entries {
            if let Some(global) = batch.global_index(local as i64) {
                if let Some(scene) = scenes.get_mut(global) {
                    scene.group_id = Some(next_group_id + group as u32);
                }
            }
        }
        next_group_id + self.group_count as u32
    }
}

#[cfg(test)]
mod tests;
