//! # Page Segmentation Pipeline
//!
//! Drives one page image through every stage and returns the cell grid
//! together with the skew-corrected page images recognition works on.
//!
//! Stage order:
//!
//! 1. resize, crop and enhance ([`enhance_page`])
//! 2. binarize the enhanced page into the working image
//! 3. paint out an ink stamp on the enhanced page
//! 4. extract horizontal and vertical ruling-line masks
//! 5. estimate skew on the horizontal mask and rotate all five images by it
//! 6. locate the table frame, project rows, synthesize borders
//! 7. group the cell rectangles into rows

use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing;

use crate::borders::{band_rects, erase_grid_lines, locate_table_frame, synthesize_borders, Band};
use crate::config::SegmentationConfig;
use crate::errors::SegmentationResult;
use crate::geometry::RotatedRect;
use crate::grouping::{group_cells, Grid};
use crate::lines::extract_lines;
use crate::observability::{record_page_metrics, record_stamp_metrics};
use crate::preprocessing::{binarize_page, enhance_page, estimate_skew, rotate_all};
use crate::projection::{find_line_positions, Axis};
use crate::stamp::{suppress_stamp, StampOutcome};

/// Something that can produce a page image.
pub trait ImageSource {
    fn load(&self) -> SegmentationResult<DynamicImage>;

    /// Name used in logs.
    fn describe(&self) -> String {
        "in-memory page".to_string()
    }
}

impl<F> ImageSource for F
where
    F: Fn() -> SegmentationResult<DynamicImage>,
{
    fn load(&self) -> SegmentationResult<DynamicImage> {
        self()
    }
}

/// A page image stored in any format the `image` crate decodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileImageSource {
    path: PathBuf,
}

impl FileImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for FileImageSource {
    fn load(&self) -> SegmentationResult<DynamicImage> {
        Ok(image::open(&self.path)?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Everything the pipeline learned about one page.
#[derive(Debug, Clone)]
pub struct PageSegmentation {
    pub grid: Grid,
    /// Cropped, skew-corrected page with grid lines painted out
    pub clean: RgbImage,
    /// Enhanced counterpart of `clean`, stamp removed
    pub enhanced: RgbImage,
    pub skew_angle_degrees: f32,
    /// `None` when the page had no ink at all
    pub table_frame: Option<RotatedRect>,
    pub stamp: StampOutcome,
    /// Horizontal line positions from the row projection
    pub row_positions: Vec<i32>,
    pub bands: Vec<Band>,
    pub processing_time: Duration,
}

/// Loads a page from `source` and segments it.
pub fn segment_source(
    source: &dyn ImageSource,
    config: &SegmentationConfig,
) -> SegmentationResult<PageSegmentation> {
    let image = source.load()?;
    tracing::debug!(
        target: "table_segmentation",
        "Loaded page {} ({}x{})",
        source.describe(),
        image.width(),
        image.height()
    );
    segment_page(&image, config)
}

/// Segments one page into a grid of cell rectangles.
///
/// # Errors
///
/// `SegmentationError::InvalidImage` for an empty page, `SegmentationError::Geometry`
/// when the configured crop misses the page or the table frame has no area.
/// A page without a table yields an empty grid instead of an error.
pub fn segment_page(
    image: &DynamicImage,
    config: &SegmentationConfig,
) -> SegmentationResult<PageSegmentation> {
    let start_time = Instant::now();

    let page = enhance_page(image, &config.preprocess)?;
    let mut clean = page.clean;
    let mut working = binarize_page(&page.enhanced, &config.preprocess)?;

    let mut enhanced_page = DynamicImage::ImageRgb8(page.enhanced);
    let stamp = suppress_stamp(&mut enhanced_page, &config.stamp)?;
    record_stamp_metrics(&stamp);
    let mut enhanced = enhanced_page.into_rgb8();

    let masks = extract_lines(&working, &config.lines);
    let mut horizontal = masks.horizontal;
    let mut vertical = masks.vertical;

    let skew = estimate_skew(&horizontal, &config.deskew);
    rotate_all(
        skew.angle_degrees,
        &mut [&mut enhanced, &mut clean],
        &mut [&mut working, &mut vertical, &mut horizontal],
    );

    let Some(table_frame) = locate_table_frame(&working, &config.borders)? else {
        tracing::warn!(
            target: "table_segmentation",
            "No ink found on the {}x{} page, returning an empty grid",
            working.width(),
            working.height()
        );
        let processing_time = start_time.elapsed();
        record_page_metrics(0, 0, skew.angle_degrees, processing_time);
        return Ok(PageSegmentation {
            grid: Grid::default(),
            clean,
            enhanced,
            skew_angle_degrees: skew.angle_degrees,
            table_frame: None,
            stamp,
            row_positions: Vec::new(),
            bands: Vec::new(),
            processing_time,
        });
    };

    let row_positions = find_line_positions(&horizontal, Axis::Rows, &config.projection);
    let bands = band_rects(
        &row_positions,
        table_frame.bounding_rect(),
        clean.dimensions(),
        &config.borders,
    );
    let layout = synthesize_borders(&bands, &vertical, &config.borders, &config.projection);

    erase_grid_lines(&mut clean, &layout, config.borders.line_thickness);
    erase_grid_lines(&mut enhanced, &layout, config.borders.line_thickness);

    let grid = group_cells(&layout.cells, config.grouping.row_gap_tolerance);
    let processing_time = start_time.elapsed();
    record_page_metrics(
        grid.cell_count(),
        layout.bands.len(),
        skew.angle_degrees,
        processing_time,
    );

    if grid.is_empty() {
        tracing::warn!(
            target: "table_segmentation",
            "No cells found: {} horizontal lines, {} bands",
            row_positions.len(),
            layout.bands.len()
        );
    }

    tracing::info!(
        target: "table_segmentation",
        rows = grid.len(),
        cells = grid.cell_count(),
        bands = layout.bands.len(),
        skew_degrees = skew.angle_degrees,
        stamp_suppressed = stamp.was_suppressed(),
        processing_time_ms = processing_time.as_millis() as u64,
        "Page segmented"
    );

    Ok(PageSegmentation {
        grid,
        clean,
        enhanced,
        skew_angle_degrees: skew.angle_degrees,
        table_frame: Some(table_frame),
        stamp,
        row_positions,
        bands: layout.bands,
        processing_time,
    })
}
