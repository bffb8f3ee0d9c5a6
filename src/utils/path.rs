//! Path helpers for segment naming

use std::path::{Path, PathBuf};

/// File stem of the input, falling back to "video"
pub fn input_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string())
}

/// `{basename}_scene_{n:03}.{ext}` for 0-based segment `index`
pub fn segment_file_name(input: &Path, index: usize, extension: &str) -> String {
    format!("{}_scene_{:03}.{}", input_stem(input), index + 1, extension)
}

/// Default split output directory: the input path without its extension
pub fn default_output_dir(input: &Path) -> PathBuf {
    input.with_extension("")
}
