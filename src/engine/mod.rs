//! Core pipeline engine: detection, splitting, grouping and the progress relay

pub mod detector;
pub mod grouper;
pub mod progress;
pub mod splitter;
pub mod thumbnail;

pub use detector::SceneDetector;
pub use grouper::SceneGrouper;
pub use progress::{JobStream, ProgressBridge, ProgressEmitter};
pub use splitter::VideoSplitter;
pub use thumbnail::ThumbnailGenerator;
