//! Output rendering: labeled thumbnail grids and the NDJSON event stream

pub mod grid;
pub mod writer;

pub use grid::GridStitcher;
pub use writer::EventWriter;
