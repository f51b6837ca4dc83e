//! # Table Segmentation
//!
//! Turns a photographed or scanned page holding a ruled table into a grid of
//! cell rectangles. The page is enhanced, stripped of ink stamps, deskewed and
//! split into cells along its ruling lines; each cell can then be handed to a
//! text recognizer and written into a delimited table.

pub mod borders;
pub mod components;
pub mod config;
pub mod errors;
pub mod geometry;
pub mod grouping;
pub mod lines;
pub mod observability;
pub mod pipeline;
pub mod preprocessing;
pub mod projection;
pub mod recognition;
pub mod stamp;
pub mod table_writer;

// Re-export types for easier access
pub use config::{AppConfig, SegmentationConfig};
pub use errors::{SegmentationError, SegmentationResult};
pub use geometry::{Rect, RotatedRect};
pub use grouping::{group_cells, Grid};
pub use pipeline::{segment_page, segment_source, FileImageSource, ImageSource, PageSegmentation};
pub use recognition::{recognize_grid, RecognitionSummary, TextRecognizer};
pub use table_writer::{SparseTable, TableWriter};
