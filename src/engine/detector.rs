//! Content-difference scene detection
//!
//! Frames are compared pairwise in HSV space. The content score of a frame is
//! the mean, over the hue, saturation and value planes, of the mean absolute
//! per-pixel difference against the previous frame (hue on OpenCV's 0..180
//! scale, saturation and value on 0..255). A frame whose score exceeds the
//! threshold opens a new scene, provided at least `min_scene_len` frames have
//! passed since the previous cut.
//!
//! Frames are subsampled by an integer factor so the longer side fits the
//! working resolution. Subsampling keeps every `factor`-th pixel; the score
//! then estimates the full-resolution score from a regular sample of pixels,
//! so hard cuts classify identically while scores near the threshold can move
//! by sampling noise.

use std::time::{Duration, Instant};

use image::RgbImage;
use tracing::{debug, info};

use crate::domain::model::{scenes_from_boundaries, ProgressUpdate, Scene, StreamInfo};
use crate::error::SceneCutResult;
use crate::ports::{FrameSource, ProgressSink};
use crate::utils::percent_of;

/// Default content threshold
pub const DEFAULT_THRESHOLD: f64 = 27.0;
/// Frames between progress reports
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 30;
/// Longest frame side scored, in pixels
pub const DEFAULT_WORKING_RESOLUTION: u32 = 256;
/// Minimum frames between two cuts
pub const DEFAULT_MIN_SCENE_LEN: u64 = 15;
/// Frame rate assumed when the source reports none
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Frame-by-frame scene detector
#[derive(Debug, Clone)]
pub struct SceneDetector {
    threshold: f64,
    min_scene_len: u64,
    working_resolution: u32,
    progress_interval: u64,
}

impl Default for SceneDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl SceneDetector {
    /// Create a detector; the threshold is used as given
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            min_scene_len: DEFAULT_MIN_SCENE_LEN,
            working_resolution: DEFAULT_WORKING_RESOLUTION,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Set the minimum scene length in frames
    pub fn with_min_scene_len(mut self, frames: u64) -> Self {
        self.min_scene_len = frames;
        self
    }

    /// Set the working resolution (0 disables downscaling)
    pub fn with_working_resolution(mut self, pixels: u32) -> Self {
        self.working_resolution = pixels;
        self
    }

    /// Set how many frames pass between progress reports
    pub fn with_progress_interval(mut self, frames: u64) -> Self {
        self.progress_interval = frames.max(1);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Smallest integer factor that brings the longer side within the working resolution
    pub fn downscale_factor(&self, width: u32, height: u32) -> u32 {
        let longest = width.max(height);
        if self.working_resolution == 0 || longest <= self.working_resolution {
            1
        } else {
            longest.div_ceil(self.working_resolution)
        }
    }

    /// Consume `source` and return its scenes, reporting progress to `sink`.
    ///
    /// Scenes are contiguous, numbered from 1, and span the whole stream. An
    /// empty stream yields no scenes.
    pub fn detect(
        &self,
        source: &mut dyn FrameSource,
        sink: &dyn ProgressSink,
    ) -> SceneCutResult<Vec<Scene>> {
        let info = source.info().clone();
        let frame_rate = effective_frame_rate(&info);
        let total_frames = info.frame_count.unwrap_or(0);
        let factor = self.downscale_factor(info.width, info.height);

        info!(
            "Detecting scenes: {}x{} @ {:.3} fps, {} frames, threshold {}, downscale {}",
            info.width, info.height, frame_rate, total_frames, self.threshold, factor
        );

        let started = Instant::now();
        let mut previous: Option<HsvPlanes> = None;
        let mut cuts: Vec<u64> = Vec::new();
        let mut last_cut: u64 = 0;
        let mut frame_num: u64 = 0;

        while let Some(frame) = source.read_next_frame()? {
            let current = HsvPlanes::from_rgb(&frame.image, factor);

            if let Some(prev) = &previous {
                let score = prev.content_score(&current);
                if score > self.threshold && frame_num - last_cut >= self.min_scene_len {
                    debug!("Cut at frame {} (score {:.2})", frame_num, score);
                    cuts.push(frame_num);
                    last_cut = frame_num;
                }
            }

            previous = Some(current);
            frame_num += 1;

            if frame_num % self.progress_interval == 0 {
                let scenes_so_far = if cuts.is_empty() { 0 } else { cuts.len() as u32 + 1 };
                sink.report(rate_update(
                    percent_of(frame_num, total_frames),
                    frame_num,
                    total_frames,
                    started.elapsed(),
                    scenes_so_far,
                ));
            }
        }

        let mut boundaries = Vec::with_capacity(cuts.len() + 2);
        if frame_num > 0 {
            boundaries.push(0.0);
            boundaries.extend(cuts.iter().map(|&cut| cut as f64 / frame_rate));
            boundaries.push(frame_num as f64 / frame_rate);
        }
        let scenes = scenes_from_boundaries(&boundaries);

        sink.report(rate_update(100, frame_num, frame_num, started.elapsed(), scenes.len() as u32));

        info!(
            "Detection finished: {} frames, {} scenes in {:.2}s",
            frame_num,
            scenes.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(scenes)
    }
}

fn effective_frame_rate(info: &StreamInfo) -> f64 {
    if info.frame_rate > 0.0 && info.frame_rate.is_finite() {
        info.frame_rate
    } else {
        FALLBACK_FRAME_RATE
    }
}

fn rate_update(
    percent: u8,
    frame_num: u64,
    total_frames: u64,
    elapsed: Duration,
    scenes_so_far: u32,
) -> ProgressUpdate {
    let elapsed = elapsed.as_secs_f64();
    let fps = if elapsed > 0.0 { frame_num as f64 / elapsed } else { 0.0 };
    let eta_seconds = if fps > 0.0 && total_frames > frame_num {
        (total_frames - frame_num) as f64 / fps
    } else {
        0.0
    };
    ProgressUpdate {
        percent,
        fps,
        eta_seconds,
        scenes_so_far,
    }
}

/// Hue, saturation and value planes of a (subsampled) frame
#[derive(Debug, Clone, PartialEq)]
pub struct HsvPlanes {
    width: u32,
    height: u32,
    hue: Vec<u8>,
    saturation: Vec<u8>,
    value: Vec<u8>,
}

impl HsvPlanes {
    /// Convert `image`, keeping every `factor`-th pixel in each direction
    pub fn from_rgb(image: &RgbImage, factor: u32) -> Self {
        let factor = factor.max(1);
        let width = image.width().div_ceil(factor);
        let height = image.height().div_ceil(factor);
        let len = (width * height) as usize;

        let mut planes = Self {
            width,
            height,
            hue: Vec::with_capacity(len),
            saturation: Vec::with_capacity(len),
            value: Vec::with_capacity(len),
        };

        for y in (0..image.height()).step_by(factor as usize) {
            for x in (0..image.width()).step_by(factor as usize) {
                let [r, g, b] = image.get_pixel(x, y).0;
                let (h, s, v) = rgb_to_hsv(r, g, b);
                planes.hue.push(h);
                planes.saturation.push(s);
                planes.value.push(v);
            }
        }
        planes
    }

    /// Mean of the per-plane mean absolute differences
    pub fn content_score(&self, other: &HsvPlanes) -> f64 {
        if self.width != other.width || self.height != other.height || self.hue.is_empty() {
            return 255.0;
        }
        let delta_hue = mean_abs_diff(&self.hue, &other.hue);
        let delta_sat = mean_abs_diff(&self.saturation, &other.saturation);
        let delta_val = mean_abs_diff(&self.value, &other.value);
        (delta_hue + delta_sat + delta_val) / 3.0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn mean_abs_diff(a: &[u8], b: &[u8]) -> f64 {
    let sum: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (x as i32 - y as i32).unsigned_abs() as u64)
        .sum();
    sum as f64 / a.len() as f64
}

/// 8-bit HSV with hue halved into 0..180
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f64, g as f64, b as f64);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    let hue = ((h / 2.0).round() as u32 % 180) as u8;
    (hue, s.round() as u8, max as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Frame;
    use crate::ports::NoOpProgressSink;
    use image::Rgb;
    use std::sync::Mutex;

    /// Solid-colour frames: each entry holds a colour until the given frame index
    struct SyntheticSource {
        info: StreamInfo,
        segments: Vec<(u64, [u8; 3])>,
        total: u64,
        next: u64,
    }

    impl SyntheticSource {
        fn new(frame_rate: f64, total: u64, segments: Vec<(u64, [u8; 3])>) -> Self {
            Self {
                info: StreamInfo {
                    frame_rate,
                    frame_count: Some(total),
                    width: 32,
                    height: 18,
                },
                segments,
                total,
                next: 0,
            }
        }
    }

    impl FrameSource for SyntheticSource {
        fn info(&self) -> &StreamInfo {
            &self.info
        }

        fn read_next_frame(&mut self) -> SceneCutResult<Option<Frame>> {
            if self.next >= self.total {
                return Ok(None);
            }
            let colour = self
                .segments
                .iter()
                .find(|(until, _)| self.next < *until)
                .map(|(_, c)| *c)
                .unwrap_or([0, 0, 0]);
            let frame = Frame {
                index: self.next,
                image: RgbImage::from_pixel(self.info.width, self.info.height, Rgb(colour)),
            };
            self.next += 1;
            Ok(Some(frame))
        }
    }

    /// HD checkerboard frames that pan one pixel per frame, with the base
    /// colour switching at the given frame indices
    struct TexturedSource {
        info: StreamInfo,
        segments: Vec<(u64, [u8; 3])>,
        next: u64,
    }

    impl TexturedSource {
        fn new(total: u64, segments: Vec<(u64, [u8; 3])>) -> Self {
            Self {
                info: StreamInfo {
                    frame_rate: 25.0,
                    frame_count: Some(total),
                    width: 1280,
                    height: 720,
                },
                segments,
                next: 0,
            }
        }
    }

    impl FrameSource for TexturedSource {
        fn info(&self) -> &StreamInfo {
            &self.info
        }

        fn read_next_frame(&mut self) -> SceneCutResult<Option<Frame>> {
            if Some(self.next) >= self.info.frame_count {
                return Ok(None);
            }
            let base = self
                .segments
                .iter()
                .find(|(until, _)| self.next < *until)
                .map(|(_, c)| *c)
                .unwrap_or([0, 0, 0]);
            let pan = self.next as u32;
            let image = RgbImage::from_fn(self.info.width, self.info.height, |x, y| {
                if ((x + pan) / 16 + y / 16) % 2 == 0 {
                    Rgb(base)
                } else {
                    Rgb(base.map(|c| (c as u32 * 3 / 4) as u8))
                }
            });
            let frame = Frame { index: self.next, image };
            self.next += 1;
            Ok(Some(frame))
        }
    }

    const RED: [u8; 3] = [255, 0, 0];
    const NAVY: [u8; 3] = [0, 0, 100];
    const WHITE: [u8; 3] = [255, 255, 255];

    #[test]
    fn test_two_cuts_scenario() {
        let mut source = SyntheticSource::new(30.0, 1200, vec![(300, RED), (750, NAVY), (1200, WHITE)]);
        let detector = SceneDetector::new(27.0);

        let scenes = detector.detect(&mut source, &NoOpProgressSink).unwrap();

        assert_eq!(
            scenes,
            vec![
                Scene::new(0.0, 10.0, 1),
                Scene::new(10.0, 25.0, 2),
                Scene::new(25.0, 40.0, 3),
            ]
        );
    }

    #[test]
    fn test_static_video_is_one_scene() {
        let mut source = SyntheticSource::new(25.0, 100, vec![(100, NAVY)]);
        let scenes = SceneDetector::default().detect(&mut source, &NoOpProgressSink).unwrap();
        assert_eq!(scenes, vec![Scene::new(0.0, 4.0, 1)]);
    }

    #[test]
    fn test_empty_video_has_no_scenes() {
        let mut source = SyntheticSource::new(30.0, 0, vec![]);
        let scenes = SceneDetector::default().detect(&mut source, &NoOpProgressSink).unwrap();
        assert!(scenes.is_empty());
    }

    #[test]
    fn test_min_scene_len_suppresses_flicker() {
        // Cut at 30, flicker back at 35 (too soon), real cut at 90
        let mut source = SyntheticSource::new(
            30.0,
            120,
            vec![(30, RED), (35, WHITE), (90, RED), (120, WHITE)],
        );
        let scenes = SceneDetector::new(27.0).detect(&mut source, &NoOpProgressSink).unwrap();
        let starts: Vec<f64> = scenes.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0.0, 1.0, 3.0]);
    }

    #[test]
    fn test_scenes_are_contiguous() {
        let mut source = SyntheticSource::new(
            24.0,
            480,
            vec![(50, RED), (170, NAVY), (300, WHITE), (480, RED)],
        );
        let scenes = SceneDetector::default().detect(&mut source, &NoOpProgressSink).unwrap();
        assert_eq!(scenes.first().map(|s| s.start), Some(0.0));
        assert_eq!(scenes.last().map(|s| s.end), Some(20.0));
        for pair in scenes.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_eq!(pair[0].scene_number + 1, pair[1].scene_number);
        }
    }

    #[test]
    fn test_progress_is_monotonic_and_finishes_at_100() {
        let updates = Mutex::new(Vec::new());
        let sink = |u: ProgressUpdate| updates.lock().unwrap().push(u);
        let mut source = SyntheticSource::new(30.0, 1200, vec![(300, RED), (750, NAVY), (1200, WHITE)]);

        SceneDetector::new(27.0).detect(&mut source, &sink).unwrap();

        let updates = updates.into_inner().unwrap();
        assert_eq!(updates.len(), 1200 / 30 + 1);
        assert!(updates.windows(2).all(|w| w[0].percent <= w[1].percent));
        let last = updates.last().unwrap();
        assert_eq!(last.percent, 100);
        assert_eq!(last.scenes_so_far, 3);
        // Before the first cut no scenes are counted, afterwards cuts + 1
        assert_eq!(updates[0].scenes_so_far, 0);
        assert_eq!(updates[10].scenes_so_far, 2);
    }

    #[test]
    fn test_unknown_frame_count_uses_sentinel() {
        let updates = Mutex::new(Vec::new());
        let sink = |u: ProgressUpdate| updates.lock().unwrap().push(u);
        let mut source = SyntheticSource::new(30.0, 90, vec![(90, RED)]);
        source.info.frame_count = None;

        SceneDetector::default().detect(&mut source, &sink).unwrap();

        let updates = updates.into_inner().unwrap();
        assert_eq!(updates.len(), 4);
        assert!(updates[..3].iter().all(|u| u.percent == 0 && u.eta_seconds == 0.0));
        assert_eq!(updates[3].percent, 100);
    }

    #[test]
    fn test_downscale_factor() {
        let detector = SceneDetector::default();
        assert_eq!(detector.downscale_factor(1920, 1080), 8);
        assert_eq!(detector.downscale_factor(1080, 1920), 8);
        assert_eq!(detector.downscale_factor(640, 360), 3);
        assert_eq!(detector.downscale_factor(256, 144), 1);
        assert_eq!(detector.with_working_resolution(0).downscale_factor(4096, 2160), 1);
    }

    #[test]
    fn test_downscaling_keeps_cut_positions() {
        let segments = vec![(16, RED), (32, NAVY), (48, WHITE)];
        let downscaled = SceneDetector::default();
        assert_eq!(downscaled.downscale_factor(1280, 720), 5);

        let small = downscaled
            .detect(&mut TexturedSource::new(48, segments.clone()), &NoOpProgressSink)
            .unwrap();
        let full = SceneDetector::default()
            .with_working_resolution(0)
            .detect(&mut TexturedSource::new(48, segments), &NoOpProgressSink)
            .unwrap();

        assert_eq!(small, full);
        let starts: Vec<f64> = small.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0.0, 0.64, 1.28]);
    }

    #[test]
    fn test_downscaled_planes_fit_working_resolution() {
        let image = RgbImage::from_pixel(1920, 1080, Rgb(RED));
        let planes = HsvPlanes::from_rgb(&image, 8);
        assert_eq!(planes.dimensions(), (240, 135));
    }

    #[test]
    fn test_content_score() {
        let red = HsvPlanes::from_rgb(&RgbImage::from_pixel(8, 8, Rgb(RED)), 1);
        let navy = HsvPlanes::from_rgb(&RgbImage::from_pixel(8, 8, Rgb(NAVY)), 1);

        assert_eq!(red.content_score(&red), 0.0);
        // hue 0 vs 120, saturation equal, value 255 vs 100
        let score = red.content_score(&navy);
        assert!((score - (120.0 + 0.0 + 155.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rgb_to_hsv() {
        assert_eq!(rgb_to_hsv(255, 0, 0), (0, 255, 255));
        assert_eq!(rgb_to_hsv(0, 255, 0), (60, 255, 255));
        assert_eq!(rgb_to_hsv(0, 0, 255), (120, 255, 255));
        assert_eq!(rgb_to_hsv(128, 128, 128), (0, 0, 128));
        assert_eq!(rgb_to_hsv(0, 0, 0), (0, 0, 0));
    }
}
