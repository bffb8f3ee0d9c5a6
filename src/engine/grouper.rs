//! Semantic scene grouping through a vision model
//!
//! Scenes are handled in batches of at most nine. Each batch becomes one
//! numbered thumbnail grid and one model query; the reply is decoded into
//! groups whose ids come from a single counter shared by every batch. A batch
//! that fails anywhere is logged and left ungrouped.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::model::{Batch, GroupAssignment, Scene};
use crate::engine::thumbnail::{decode_thumbnail, ThumbnailGenerator};
use crate::error::{SceneCutError, SceneCutResult};
use crate::output::grid::{GridStitcher, MAX_CELLS};
use crate::ports::VisionModel;

/// Scenes per grid
pub const DEFAULT_BATCH_SIZE: usize = 9;

/// Default directory for thumbnails and stitched grids
pub const DEFAULT_SCRATCH_DIR: &str = "temp_thumbnails";

/// File name of the most recent stitched grid in the scratch directory
pub const GRID_FILE_NAME: &str = "grid_stitch.jpg";

/// Instruction sent with every grid
pub fn grouping_prompt(count: usize) -> String {
    format!(
        "You are a professional film editor. The image provided contains {count} numbered scenes in a grid. \
         Group them into logical events or locations based on visual similarity and narrative context. \
         Return the result strictly as a valid JSON list of lists of indices (the numbers shown on the images). \
         Example: [[1, 2], [3], [4, 5, 6]]. \
         Ensure every index from 1 to {count} is included exactly once."
    )
}

/// Find the first JSON list of lists in a free-form model reply.
///
/// Every `[` is tried as the start of a JSON value, in order. The first one
/// that decodes to an array holding at least one array wins; its non-array
/// members are dropped.
pub fn parse_group_response(text: &str) -> SceneCutResult<Vec<Vec<Value>>> {
    for (pos, _) in text.match_indices('[') {
        let mut values = serde_json::Deserializer::from_str(&text[pos..]).into_iter::<Value>();
        if let Some(Ok(Value::Array(items))) = values.next() {
            if !items.iter().any(Value::is_array) {
                continue;
            }
            return Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Array(members) => Some(members),
                    _ => None,
                })
                .collect());
        }
    }

    Err(SceneCutError::GroupParse {
        message: format!("no JSON list of lists in response ({} chars)", text.len()),
    })
}

/// Assigns `group_id`s to scenes with a vision model
pub struct SceneGrouper {
    thumbnails: ThumbnailGenerator,
    stitcher: GridStitcher,
    model: Arc<dyn VisionModel>,
    batch_size: usize,
    scratch_dir: PathBuf,
}

impl SceneGrouper {
    pub fn new(thumbnails: ThumbnailGenerator, model: Arc<dyn VisionModel>) -> Self {
        Self {
            thumbnails,
            stitcher: GridStitcher::new(),
            model,
            batch_size: DEFAULT_BATCH_SIZE,
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
        }
    }

    pub fn with_stitcher(mut self, stitcher: GridStitcher) -> Self {
        self.stitcher = stitcher;
        self
    }

    /// Scenes per batch, clamped to what one grid can label
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_CELLS);
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Group `scenes` with ids starting at 1. Never fails.
    pub async fn group(&self, input: &Path, scenes: Vec<Scene>) -> Vec<Scene> {
        self.group_from(input, scenes, 1).await.0
    }

    /// Group `scenes` with ids starting at `first_group_id`.
    ///
    /// Returns the scenes and the next unused group id.
    pub async fn group_from(
        &self,
        input: &Path,
        mut scenes: Vec<Scene>,
        first_group_id: u32,
    ) -> (Vec<Scene>, u32) {
        let batches = Batch::plan(scenes.len(), self.batch_size);
        info!(
            "Grouping {} scenes in {} batches with {}",
            scenes.len(),
            batches.len(),
            self.model.name()
        );

        if let Err(e) = tokio::fs::create_dir_all(&self.scratch_dir).await {
            warn!(
                "Cannot create scratch directory {}: {}",
                self.scratch_dir.display(),
                e
            );
        }

        let mut next_group_id = first_group_id;
        let mut grouped_batches = 0;
        for (n, range) in batches.into_iter().enumerate() {
            match self.process_batch(input, &scenes, range).await {
                Ok((batch, assignment)) => {
                    debug!(
                        "Batch {}: {} groups for {} scenes",
                        n + 1,
                        assignment.group_count,
                        batch.indices.len()
                    );
                    next_group_id = assignment.merge_into(&mut scenes, &batch, next_group_id);
                    grouped_batches += 1;
                }
                Err(e) => warn!("Skipping batch {}: {}", n + 1, e),
            }
        }

        info!(
            "Grouping finished: {} batches grouped, {} groups assigned",
            grouped_batches,
            next_group_id - first_group_id
        );
        (scenes, next_group_id)
    }

    async fn process_batch(
        &self,
        input: &Path,
        scenes: &[Scene],
        range: Range<usize>,
    ) -> SceneCutResult<(Batch, GroupAssignment)> {
        let mut images = Vec::with_capacity(range.len());
        for idx in range.clone() {
            let at = self.thumbnails.scene_target(&scenes[idx]);
            let bytes = self.thumbnails.scene_thumbnail(input, &scenes[idx]).await?;
            self.save_scratch(&format!("scene_{}.jpg", idx), &bytes).await;
            images.push(decode_thumbnail(&bytes, at)?);
        }

        let grid = self.stitcher.stitch(&images)?;
        let batch = Batch {
            indices: range.collect(),
            stitched_image: GridStitcher::encode_jpeg(&grid)?,
        };
        self.save_scratch(GRID_FILE_NAME, &batch.stitched_image).await;

        let prompt = grouping_prompt(batch.indices.len());
        let reply = self.model.query(&prompt, &batch.stitched_image).await?;
        debug!("Model reply: {}", reply);

        let groups = parse_group_response(&reply)?;
        let assignment = GroupAssignment::from_groups(&groups, batch.indices.len());
        Ok((batch, assignment))
    }

    async fn save_scratch(&self, name: &str, bytes: &[u8]) {
        let path = self.scratch_dir.join(name);
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            debug!("Could not write {}: {}", path.display(), e);
        }
    }
}
