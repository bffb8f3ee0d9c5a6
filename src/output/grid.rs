//! Labeled thumbnail grids for vision-model queries

use std::io::Cursor;
use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::debug;

use crate::error::{SceneCutError, SceneCutResult};

/// Grid width in cells
pub const DEFAULT_COLUMNS: u32 = 3;

/// Most images one grid carries
pub const MAX_CELLS: usize = 9;

/// Side of the square label box in pixels
pub const LABEL_BOX: u32 = 30;

/// Label box inset from the cell corner
pub const LABEL_MARGIN: u32 = 5;

const JPEG_QUALITY: u8 = 90;
const LABEL_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
const LABEL_FOREGROUND: Rgb<u8> = Rgb([255, 255, 255]);

// 5x7 digit glyphs, one row per byte, high bit on the left
const DIGIT_GLYPHS: [[u8; 7]; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// How cell numbers are drawn
enum LabelFace {
    Bitmap,
    Font { font: FontVec, scale: PxScale },
}

/// Lays images into a numbered row-major grid
pub struct GridStitcher {
    columns: u32,
    face: LabelFace,
}

impl Default for GridStitcher {
    fn default() -> Self {
        Self::new()
    }
}

impl GridStitcher {
    pub fn new() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            face: LabelFace::Bitmap,
        }
    }

    pub fn with_columns(mut self, columns: u32) -> Self {
        self.columns = columns.max(1);
        self
    }

    /// Render labels with a TrueType/OpenType font instead of the bitmap digits
    pub fn with_font_file(mut self, path: &Path) -> SceneCutResult<Self> {
        let data = std::fs::read(path)?;
        let font = FontVec::try_from_vec(data).map_err(|e| {
            SceneCutError::config(format!("Invalid label font {}: {}", path.display(), e))
        })?;
        self.face = LabelFace::Font {
            font,
            scale: PxScale::from(24.0),
        };
        Ok(self)
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Compose `images` into one grid, labeling cells 1..=n.
    ///
    /// Cell size is taken from the first image; others are resized to it.
    pub fn stitch(&self, images: &[DynamicImage]) -> SceneCutResult<RgbImage> {
        let first = images.first().ok_or_else(|| SceneCutError::Stitch {
            message: "no images to stitch".to_string(),
        })?;
        if images.len() > MAX_CELLS {
            return Err(SceneCutError::Stitch {
                message: format!("{} images exceed the {} cell limit", images.len(), MAX_CELLS),
            });
        }

        let (cell_w, cell_h) = (first.width(), first.height());
        if cell_w == 0 || cell_h == 0 {
            return Err(SceneCutError::Stitch {
                message: "first image is empty".to_string(),
            });
        }

        let rows = (images.len() as u32).div_ceil(self.columns);
        let mut canvas = RgbImage::new(cell_w * self.columns, cell_h * rows);
        debug!(
            "Stitching {} images into {}x{} grid of {}x{} cells",
            images.len(),
            self.columns,
            rows,
            cell_w,
            cell_h
        );

        for (i, image) in images.iter().enumerate() {
            let col = i as u32 % self.columns;
            let row = i as u32 / self.columns;
            let (x, y) = (col * cell_w, row * cell_h);

            let mut cell = image.to_rgb8();
            if cell.dimensions() != (cell_w, cell_h) {
                cell = imageops::resize(&cell, cell_w, cell_h, FilterType::Triangle);
            }
            imageops::replace(&mut canvas, &cell, x as i64, y as i64);
            self.draw_label(&mut canvas, x, y, i + 1);
        }

        Ok(canvas)
    }

    fn draw_label(&self, canvas: &mut RgbImage, cell_x: u32, cell_y: u32, number: usize) {
        let box_x = (cell_x + LABEL_MARGIN) as i32;
        let box_y = (cell_y + LABEL_MARGIN) as i32;
        draw_filled_rect_mut(
            canvas,
            Rect::at(box_x, box_y).of_size(LABEL_BOX, LABEL_BOX),
            LABEL_BACKGROUND,
        );

        let text = number.to_string();
        match &self.face {
            LabelFace::Font { font, scale } => {
                draw_text_mut(canvas, LABEL_FOREGROUND, box_x + 7, box_y + 2, *scale, font, &text);
            }
            LabelFace::Bitmap => draw_bitmap_digits(canvas, box_x, box_y, &text),
        }
    }

    /// Encode a grid as JPEG
    pub fn encode_jpeg(grid: &RgbImage) -> SceneCutResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(grid)?;
        Ok(out.into_inner())
    }
}

/// Center `text` (ASCII digits) inside the label box at (`box_x`, `box_y`)
fn draw_bitmap_digits(canvas: &mut RgbImage, box_x: i32, box_y: i32, text: &str) {
    let digits: Vec<usize> = text
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as usize)
        .collect();
    if digits.is_empty() {
        return;
    }

    let scale: u32 = if digits.len() == 1 { 3 } else { 2 };
    let count = digits.len() as u32;
    let text_w = count * GLYPH_WIDTH * scale + (count - 1) * scale;
    let text_h = GLYPH_HEIGHT * scale;
    let origin_x = box_x + (LABEL_BOX.saturating_sub(text_w) / 2) as i32;
    let origin_y = box_y + (LABEL_BOX.saturating_sub(text_h) / 2) as i32;

    for (n, digit) in digits.into_iter().enumerate() {
        let glyph_x = origin_x + (n as u32 * (GLYPH_WIDTH + 1) * scale) as i32;
        for (row, bits) in DIGIT_GLYPHS[digit].iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let px = glyph_x + (col * scale) as i32;
                let py = origin_y + (row as u32 * scale) as i32;
                draw_filled_rect_mut(
                    canvas,
                    Rect::at(px, py).of_size(scale, scale),
                    LABEL_FOREGROUND,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb<u8> = Rgb([200, 0, 0]);

    fn solid(width: u32, height: u32, color: Rgb<u8>) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, color))
    }

    fn white_pixels_in_box(grid: &RgbImage, cell_x: u32, cell_y: u32) -> usize {
        let mut count = 0;
        for y in cell_y + LABEL_MARGIN..cell_y + LABEL_MARGIN + LABEL_BOX {
            for x in cell_x + LABEL_MARGIN..cell_x + LABEL_MARGIN + LABEL_BOX {
                if *grid.get_pixel(x, y) == LABEL_FOREGROUND {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn test_grid_geometry() {
        let stitcher = GridStitcher::new();
        let images: Vec<_> = (0..4).map(|_| solid(64, 48, RED)).collect();
        let grid = stitcher.stitch(&images).unwrap();
        assert_eq!(grid.dimensions(), (192, 96));

        let images: Vec<_> = (0..9).map(|_| solid(64, 48, RED)).collect();
        let grid = stitcher.stitch(&images).unwrap();
        assert_eq!(grid.dimensions(), (192, 144));
    }

    #[test]
    fn test_cells_placed_row_major_and_empty_slots_black() {
        let images = vec![
            solid(64, 48, RED),
            solid(64, 48, Rgb([0, 200, 0])),
            solid(64, 48, Rgb([0, 0, 200])),
            solid(64, 48, Rgb([200, 200, 0])),
        ];
        let grid = GridStitcher::new().stitch(&images).unwrap();

        assert_eq!(*grid.get_pixel(60, 44), RED);
        assert_eq!(*grid.get_pixel(64 + 60, 44), Rgb([0, 200, 0]));
        assert_eq!(*grid.get_pixel(128 + 60, 44), Rgb([0, 0, 200]));
        assert_eq!(*grid.get_pixel(60, 48 + 44), Rgb([200, 200, 0]));
        assert_eq!(*grid.get_pixel(64 + 60, 48 + 44), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_mismatched_images_resized_to_first() {
        let images = vec![solid(64, 48, RED), solid(128, 128, Rgb([0, 0, 200]))];
        let grid = GridStitcher::new().stitch(&images).unwrap();
        assert_eq!(grid.dimensions(), (192, 48));
        assert_eq!(*grid.get_pixel(64 + 60, 44), Rgb([0, 0, 200]));
        assert_eq!(*grid.get_pixel(128 + 10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_every_cell_is_labeled() {
        let images: Vec<_> = (0..9).map(|_| solid(64, 48, RED)).collect();
        let grid = GridStitcher::new().stitch(&images).unwrap();

        for i in 0..9u32 {
            let (x, y) = ((i % 3) * 64, (i / 3) * 48);
            // Box corner stays dark, glyph pixels are white
            assert_eq!(*grid.get_pixel(x + LABEL_MARGIN, y + LABEL_MARGIN), LABEL_BACKGROUND);
            assert!(white_pixels_in_box(&grid, x, y) > 0, "cell {} has no label", i + 1);
        }
        // "1" and "8" have different glyphs
        assert_ne!(white_pixels_in_box(&grid, 0, 0), white_pixels_in_box(&grid, 64, 96));
    }

    #[test]
    fn test_stitch_is_deterministic() {
        let images: Vec<_> = (0..5).map(|i| solid(40, 40, Rgb([i * 40, 10, 10]))).collect();
        let stitcher = GridStitcher::new();
        assert_eq!(stitcher.stitch(&images).unwrap(), stitcher.stitch(&images).unwrap());
    }

    #[test]
    fn test_stitch_rejects_empty_and_oversized() {
        let stitcher = GridStitcher::new();
        assert!(matches!(stitcher.stitch(&[]), Err(SceneCutError::Stitch { .. })));
        let images: Vec<_> = (0..10).map(|_| solid(8, 8, RED)).collect();
        assert!(matches!(stitcher.stitch(&images), Err(SceneCutError::Stitch { .. })));
    }

    #[test]
    fn test_small_cells_clip_label() {
        let images: Vec<_> = (0..2).map(|_| solid(16, 16, RED)).collect();
        let grid = GridStitcher::new().stitch(&images).unwrap();
        assert_eq!(grid.dimensions(), (48, 16));
    }

    #[test]
    fn test_custom_columns() {
        let images: Vec<_> = (0..4).map(|_| solid(20, 10, RED)).collect();
        let grid = GridStitcher::new().with_columns(2).stitch(&images).unwrap();
        assert_eq!(grid.dimensions(), (40, 20));
    }

    #[test]
    fn test_encode_jpeg() {
        let grid = GridStitcher::new().stitch(&[solid(64, 48, RED)]).unwrap();
        let bytes = GridStitcher::encode_jpeg(&grid).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (192, 48));
    }

    #[test]
    fn test_invalid_font_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(GridStitcher::new().with_font_file(&path).is_err());
    }
}
