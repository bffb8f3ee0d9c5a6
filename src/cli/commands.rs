//! Command implementations

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::decode_libav::probe_frame_rate;
use crate::adapters::{AppConfig, FfmpegCli, LibavFrameSource, OllamaVisionAdapter};
use crate::cli::args::{AnalyzeArgs, GroupArgs, SplitArgs};
use crate::domain::model::{AnalysisReport, ProgressEvent, Scene, SplitReport};
use crate::engine::{ProgressBridge, SceneDetector, SceneGrouper, ThumbnailGenerator, VideoSplitter};
use crate::output::{EventWriter, GridStitcher};
use crate::utils::path::default_output_dir;

/// Execute the analyze command
pub async fn analyze(args: AnalyzeArgs, config: &AppConfig) -> Result<()> {
    ensure_input(&args.input)?;
    crate::init()?;
    info!(
        "Analyzing {} (threshold {})",
        args.input.display(),
        config.detector.threshold
    );

    let detector = SceneDetector::new(config.detector.threshold)
        .with_min_scene_len(config.detector.min_scene_len)
        .with_working_resolution(config.detector.working_resolution)
        .with_progress_interval(config.detector.progress_interval);

    let input = args.input.clone();
    let stream = bridge(config).run(move |emitter| {
        let mut source = LibavFrameSource::open(&input)?;
        let scenes = detector.detect(&mut source, emitter)?;
        Ok(AnalysisReport {
            video_path: input.display().to_string(),
            scenes,
        })
    });

    let mut writer = EventWriter::new(std::io::stdout());
    let terminal = match writer.relay_progress(stream).await? {
        ProgressEvent::Complete(mut report) if args.group => {
            let grouper = build_grouper(config)?;
            report.scenes = grouper.group(&args.input, report.scenes).await;
            ProgressEvent::Complete(report)
        }
        other => other,
    };
    finish(&mut writer, terminal, "Analysis")
}

/// Execute the split command
pub async fn split(args: SplitArgs, config: &AppConfig) -> Result<()> {
    ensure_input(&args.input)?;
    let scenes = read_scenes(&args.scenes)?;
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&args.input));

    let ffmpeg = FfmpegCli::new(&config.ffmpeg);
    ffmpeg
        .ensure_available()
        .context("ffmpeg is required for splitting")?;
    crate::init()?;
    let frame_rate = probe_frame_rate(&args.input);
    info!(
        "Splitting {} into {} scenes ({} fps)",
        args.input.display(),
        scenes.len(),
        frame_rate.map_or_else(|| "unknown".to_string(), |fps| format!("{:.3}", fps))
    );

    let splitter =
        VideoSplitter::new(Arc::new(ffmpeg)).with_profile(config.splitter.profile.clone());
    let input = args.input.clone();
    let stream = bridge(config).run(move |emitter| {
        let files = splitter.split(&input, frame_rate, &scenes, &output_dir, emitter)?;
        Ok(SplitReport {
            files: files.iter().map(|f| f.display().to_string()).collect(),
            output_dir: output_dir.display().to_string(),
        })
    });

    let mut writer = EventWriter::new(std::io::stdout());
    let terminal = writer.relay_progress(stream).await?;
    finish(&mut writer, terminal, "Split")
}

/// Execute the group command
pub async fn group(args: GroupArgs, config: &AppConfig) -> Result<()> {
    ensure_input(&args.input)?;
    let scenes = read_scenes(&args.scenes)?;
    let grouper = build_grouper(config)?;

    let grouped = grouper.group(&args.input, scenes).await;
    let json = serde_json::to_string_pretty(&grouped).context("Failed to encode scenes")?;
    println!("{}", json);
    Ok(())
}

fn bridge(config: &AppConfig) -> ProgressBridge {
    ProgressBridge::new().with_poll_interval(config.bridge.poll_interval())
}

/// Write the terminal record and turn a failed job into a non-zero exit
fn finish<W, T>(writer: &mut EventWriter<W>, terminal: ProgressEvent<T>, job: &str) -> Result<()>
where
    W: std::io::Write,
    T: serde::Serialize,
{
    writer.write_event(&terminal)?;
    match terminal {
        ProgressEvent::Error { message } => Err(anyhow::anyhow!("{} failed: {}", job, message)),
        _ => {
            info!("{} completed", job);
            Ok(())
        }
    }
}

fn ensure_input(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "Input file does not exist: {}",
            path.display()
        ));
    }
    Ok(())
}

fn build_grouper(config: &AppConfig) -> Result<SceneGrouper> {
    let ffmpeg = Arc::new(FfmpegCli::new(&config.ffmpeg));
    let thumbnails = ThumbnailGenerator::new(ffmpeg)
        .with_width(config.thumbnails.width)
        .with_offset(config.thumbnails.offset);

    let model = OllamaVisionAdapter::new(
        &config.grouping.endpoint,
        &config.grouping.model,
        Duration::from_secs(config.grouping.timeout_secs),
    )?;

    let mut stitcher = GridStitcher::new().with_columns(config.grouping.columns);
    if let Some(font) = &config.grouping.label_font {
        stitcher = stitcher
            .with_font_file(font)
            .with_context(|| format!("Failed to load label font {}", font.display()))?;
    }

    Ok(SceneGrouper::new(thumbnails, Arc::new(model))
        .with_stitcher(stitcher)
        .with_batch_size(config.grouping.batch_size)
        .with_scratch_dir(config.grouping.scratch_dir.clone()))
}

/// Read a scene list from a file or stdin (`-`)
fn read_scenes(source: &str) -> Result<Vec<Scene>> {
    let content = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read scenes from stdin")?;
        buffer
    } else {
        let path = PathBuf::from(source);
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenes file {}", path.display()))?
    };
    parse_scenes(&content)
}

/// Accept a bare scene array or any object carrying a `scenes` array,
/// such as the analyze command's complete record
pub fn parse_scenes(content: &str) -> Result<Vec<Scene>> {
    let value: serde_json::Value =
        serde_json::from_str(content.trim()).context("Scenes are not valid JSON")?;
    let list = match value {
        serde_json::Value::Object(mut object) => object
            .remove("scenes")
            .ok_or_else(|| anyhow::anyhow!("JSON object has no \"scenes\" field"))?,
        other => other,
    };
    let scenes: Vec<Scene> = serde_json::from_value(list).context("Invalid scene list")?;
    for scene in &scenes {
        scene.validate()?;
    }
    Ok(scenes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scene_array() {
        let scenes = parse_scenes(
            r#"[{"start":0.0,"end":10.0,"scene_number":1},{"start":10.0,"end":25.0,"scene_number":2}]"#,
        )
        .unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[1], Scene::new(10.0, 25.0, 2));
    }

    #[test]
    fn test_parse_complete_record() {
        let record = r#"{"type":"complete","video_path":"in.mp4","scenes":[{"start":0.0,"end":4.5,"scene_number":1,"group_id":3}]}"#;
        let scenes = parse_scenes(record).unwrap();
        assert_eq!(scenes[0].group_id, Some(3));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_scenes("not json").is_err());
        assert!(parse_scenes(r#"{"files":[]}"#).is_err());
        assert!(parse_scenes(r#"[{"start":5.0,"end":2.0,"scene_number":1}]"#).is_err());
    }

    #[test]
    fn test_ensure_input() {
        assert!(ensure_input(Path::new("/no/such/video.mp4")).is_err());
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(ensure_input(file.path()).is_ok());
    }
}
