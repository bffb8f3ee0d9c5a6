//! Single-frame thumbnail extraction

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use tracing::debug;

use crate::domain::model::Scene;
use crate::error::{SceneCutError, SceneCutResult};
use crate::ports::FrameGrabber;

/// Forward nudge applied to every requested timestamp
pub const DEFAULT_OFFSET_SECONDS: f64 = 0.1;

/// Distance kept from a scene's end when picking its frame
pub const SCENE_END_MARGIN_SECONDS: f64 = 0.05;

/// Thumbnail width in pixels; height follows the source aspect ratio
pub const DEFAULT_WIDTH: u32 = 200;

/// Extracts small representative frames
pub struct ThumbnailGenerator {
    grabber: Arc<dyn FrameGrabber>,
    offset: f64,
    width: u32,
}

impl ThumbnailGenerator {
    pub fn new(grabber: Arc<dyn FrameGrabber>) -> Self {
        Self {
            grabber,
            offset: DEFAULT_OFFSET_SECONDS,
            width: DEFAULT_WIDTH,
        }
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset.max(0.0);
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width.max(1);
        self
    }

    /// Encoded frame at `at + offset` seconds
    pub async fn thumbnail(&self, input: &Path, at: f64) -> SceneCutResult<Vec<u8>> {
        self.grab(input, at + self.offset).await
    }

    /// Timestamp used for a scene's representative frame.
    ///
    /// The nudged midpoint, pulled back inside `[start, end)` for scenes
    /// shorter than twice the offset.
    pub fn scene_target(&self, scene: &Scene) -> f64 {
        let latest = (scene.end - SCENE_END_MARGIN_SECONDS).max(scene.start);
        (scene.midpoint() + self.offset).min(latest)
    }

    /// Encoded representative frame of `scene`
    pub async fn scene_thumbnail(&self, input: &Path, scene: &Scene) -> SceneCutResult<Vec<u8>> {
        self.grab(input, self.scene_target(scene)).await
    }

    async fn grab(&self, input: &Path, target: f64) -> SceneCutResult<Vec<u8>> {
        debug!("Extracting thumbnail at {:.3}s from {}", target, input.display());

        let bytes = self.grabber.grab_frame(input, target, self.width).await?;
        if bytes.is_empty() {
            return Err(SceneCutError::Thumbnail {
                at: target,
                message: "extractor produced no data".to_string(),
            });
        }
        Ok(bytes)
    }
}

/// Decode thumbnail bytes extracted at `at` seconds
pub fn decode_thumbnail(bytes: &[u8], at: f64) -> SceneCutResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| SceneCutError::Thumbnail {
        at,
        message: format!("undecodable image: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    struct FakeGrabber {
        calls: Mutex<Vec<(f64, u32)>>,
        payload: Vec<u8>,
    }

    #[async_trait]
    impl FrameGrabber for FakeGrabber {
        async fn grab_frame(&self, _input: &Path, at: f64, width: u32) -> SceneCutResult<Vec<u8>> {
            self.calls.lock().unwrap().push((at, width));
            Ok(self.payload.clone())
        }
    }

    fn png_bytes() -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30]))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn test_offset_and_width_forwarded() {
        let grabber = Arc::new(FakeGrabber {
            calls: Mutex::new(Vec::new()),
            payload: png_bytes(),
        });
        let generator = ThumbnailGenerator::new(grabber.clone());

        let bytes = generator.thumbnail(Path::new("a.mp4"), 5.0).await.unwrap();

        assert!(!bytes.is_empty());
        let calls = grabber.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!((calls[0].0 - 5.1).abs() < 1e-9);
        assert_eq!(calls[0].1, DEFAULT_WIDTH);
    }

    #[tokio::test]
    async fn test_empty_output_is_an_error() {
        let generator = ThumbnailGenerator::new(Arc::new(FakeGrabber {
            calls: Mutex::new(Vec::new()),
            payload: Vec::new(),
        }));

        let err = generator.thumbnail(Path::new("a.mp4"), 1.0).await.unwrap_err();
        assert!(matches!(err, SceneCutError::Thumbnail { .. }));
    }

    #[tokio::test]
    async fn test_thumbnail_decodes() {
        let generator = ThumbnailGenerator::new(Arc::new(FakeGrabber {
            calls: Mutex::new(Vec::new()),
            payload: png_bytes(),
        }))
        .with_width(120);

        let bytes = generator.thumbnail(Path::new("a.mp4"), 0.0).await.unwrap();
        let image = decode_thumbnail(&bytes, 0.1).unwrap();
        assert_eq!((image.width(), image.height()), (4, 3));
    }

    #[test]
    fn test_scene_target_stays_inside_scene() {
        let generator = ThumbnailGenerator::new(Arc::new(FakeGrabber {
            calls: Mutex::new(Vec::new()),
            payload: Vec::new(),
        }));

        let long = Scene::new(10.0, 20.0, 1);
        assert!((generator.scene_target(&long) - 15.1).abs() < 1e-9);

        // Trailing fade-out of three frames at 25 fps
        let short = Scene::new(39.88, 40.0, 7);
        let target = generator.scene_target(&short);
        assert!(target >= short.start && target < short.end);
        assert!((target - 39.95).abs() < 1e-9);

        let tiny = Scene::new(5.0, 5.02, 2);
        assert_eq!(generator.scene_target(&tiny), 5.0);
    }

    #[tokio::test]
    async fn test_scene_thumbnail_requests_clamped_time() {
        let grabber = Arc::new(FakeGrabber {
            calls: Mutex::new(Vec::new()),
            payload: png_bytes(),
        });
        let generator = ThumbnailGenerator::new(grabber.clone());

        generator
            .scene_thumbnail(Path::new("a.mp4"), &Scene::new(59.9, 60.0, 12))
            .await
            .unwrap();

        let at = grabber.calls.lock().unwrap()[0].0;
        assert!(at < 60.0 && at >= 59.9);
    }

    #[test]
    fn test_garbage_bytes_fail_decode() {
        let err = decode_thumbnail(b"definitely not an image", 2.5).unwrap_err();
        assert!(matches!(err, SceneCutError::Thumbnail { .. }));
        assert!(err.to_string().contains("undecodable"));
    }
}
