//! # Cell Recognition Hand-off
//!
//! Crops every cell of a segmented page, skips blank ones, upscales the rest,
//! passes them to a [`TextRecognizer`] and stores the cleaned text in a
//! [`TableWriter`] at the cell's `(column, row)` position.

use image::{imageops, imageops::FilterType, GenericImageView, RgbImage};
use lazy_static::lazy_static;
use regex::Regex;
use std::time::{Duration, Instant};
use tracing;

use crate::config::RecognitionConfig;
use crate::errors::{error_logging, SegmentationError, SegmentationResult};
use crate::geometry::Rect;
use crate::observability::{cell_span, record_recognition_metrics};
use crate::pipeline::PageSegmentation;
use crate::table_writer::TableWriter;

lazy_static! {
    static ref DEFAULT_TEXT_FILTER: Regex =
        Regex::new(r"[^\p{L}\p{N}]+").expect("Default text filter should be valid");
}

/// Reads the text of one cell image.
pub trait TextRecognizer {
    fn recognize(&mut self, cell: &RgbImage) -> SegmentationResult<String>;
}

impl<F> TextRecognizer for F
where
    F: FnMut(&RgbImage) -> SegmentationResult<String>,
{
    fn recognize(&mut self, cell: &RgbImage) -> SegmentationResult<String> {
        self(cell)
    }
}

/// Replaces every run of filtered characters with one space and trims.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    filter: Regex,
}

impl TextCleaner {
    pub fn new(pattern: &str) -> SegmentationResult<Self> {
        let filter = Regex::new(pattern).map_err(|e| {
            SegmentationError::config(format!("invalid text filter '{}': {}", pattern, e))
        })?;
        Ok(Self { filter })
    }

    pub fn clean(&self, raw: &str) -> String {
        self.filter.replace_all(raw, " ").trim().to_string()
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self {
            filter: DEFAULT_TEXT_FILTER.clone(),
        }
    }
}

/// Cleans recognized text with the default filter, keeping letters and digits.
pub fn clean_text(raw: &str) -> String {
    TextCleaner::default().clean(raw)
}

/// True when every pixel of the region is brighter than `white_level` in all
/// channels. Regions outside the image count as blank.
pub fn is_blank_cell(image: &RgbImage, cell: Rect, white_level: u8) -> bool {
    let Some(region) = cell.clip_to(image.width(), image.height()) else {
        return true;
    };
    let view = imageops::crop_imm(
        image,
        region.x as u32,
        region.y as u32,
        region.width,
        region.height,
    );
    view.pixels()
        .all(|(_, _, p)| p.0.iter().all(|&c| c > white_level))
}

/// Crops a cell and upscales it by `factor` for recognition.
pub fn prepare_cell(image: &RgbImage, cell: Rect, factor: u32) -> Option<RgbImage> {
    let region = cell.clip_to(image.width(), image.height())?;
    let crop = imageops::crop_imm(
        image,
        region.x as u32,
        region.y as u32,
        region.width,
        region.height,
    )
    .to_image();
    if factor <= 1 {
        return Some(crop);
    }
    Some(imageops::resize(
        &crop,
        region.width * factor,
        region.height * factor,
        FilterType::Gaussian,
    ))
}

/// Counts of what happened to the cells of one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecognitionSummary {
    /// Cells written to the table
    pub recognized: usize,
    /// Cells skipped because they hold no ink
    pub blank: usize,
    /// Cells whose cleaned text was empty
    pub empty_text: usize,
    /// Cells the recognizer failed on
    pub failed: usize,
    pub duration: Duration,
}

/// Recognizes every non-blank cell of a page and writes the cleaned text.
///
/// A recognizer failure on one cell is logged and counted; the remaining
/// cells are still processed.
///
/// # Errors
///
/// `SegmentationError::Config` when the configured text filter is invalid.
pub fn recognize_grid(
    page: &PageSegmentation,
    recognizer: &mut dyn TextRecognizer,
    writer: &mut dyn TableWriter,
    config: &RecognitionConfig,
) -> SegmentationResult<RecognitionSummary> {
    let start_time = Instant::now();
    let cleaner = TextCleaner::new(&config.text_filter)?;
    let mut summary = RecognitionSummary::default();

    for (column, row, cell) in page.grid.cells() {
        let _span = cell_span(row, column).entered();

        if is_blank_cell(&page.enhanced, cell, config.white_level) {
            summary.blank += 1;
            continue;
        }
        let Some(image) = prepare_cell(&page.clean, cell, config.upscale_factor) else {
            summary.blank += 1;
            continue;
        };

        match recognizer.recognize(&image) {
            Ok(raw) => {
                let text = cleaner.clean(&raw);
                if text.is_empty() {
                    summary.empty_text += 1;
                } else {
                    writer.set_cell(column, row, &text);
                    summary.recognized += 1;
                }
            }
            Err(e) => {
                error_logging::log_recognition_error(&e, row, column, (cell.width, cell.height));
                summary.failed += 1;
            }
        }
    }

    summary.duration = start_time.elapsed();
    record_recognition_metrics(
        summary.recognized,
        summary.blank,
        summary.failed,
        summary.duration,
    );

    tracing::debug!(
        target: "table_segmentation",
        "Recognition completed in {}ms: recognized={}, blank={}, empty={}, failed={}",
        summary.duration.as_millis(),
        summary.recognized,
        summary.blank,
        summary.empty_text,
        summary.failed
    );

    Ok(summary)
}

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractRecognizer;

#[cfg(feature = "tesseract")]
mod tesseract {
    use image::{DynamicImage, ImageFormat, RgbImage};
    use leptess::LepTess;
    use std::io::Cursor;

    use super::TextRecognizer;
    use crate::errors::{SegmentationError, SegmentationResult};

    /// Tesseract engine bound to one recognition language.
    pub struct TesseractRecognizer {
        tess: LepTess,
    }

    impl TesseractRecognizer {
        pub fn new(language: &str) -> SegmentationResult<Self> {
            let tess = LepTess::new(None, language).map_err(|e| {
                SegmentationError::recognition(format!(
                    "failed to initialize Tesseract for '{}': {}",
                    language, e
                ))
            })?;
            Ok(Self { tess })
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        fn recognize(&mut self, cell: &RgbImage) -> SegmentationResult<String> {
            let mut png = Vec::new();
            DynamicImage::ImageRgb8(cell.clone())
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

            self.tess.set_image_from_mem(&png).map_err(|e| {
                SegmentationError::recognition(format!("failed to load cell image: {}", e))
            })?;
            self.tess.get_utf8_text().map_err(|e| {
                SegmentationError::recognition(format!("failed to extract cell text: {}", e))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::group_cells;
    use crate::stamp::StampOutcome;
    use crate::table_writer::SparseTable;
    use image::Rgb;

    fn page_with_cells(cells: &[Rect], inked: &[Rect]) -> PageSegmentation {
        let mut clean = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        for rect in inked {
            for y in rect.y..rect.bottom() {
                for x in rect.x..rect.right() {
                    clean.put_pixel(x as u32, y as u32, Rgb([0, 0, 0]));
                }
            }
        }
        PageSegmentation {
            grid: group_cells(cells, 5),
            enhanced: clean.clone(),
            clean,
            skew_angle_degrees: 0.0,
            table_frame: None,
            stamp: StampOutcome::NoColoredPixels,
            row_positions: Vec::new(),
            bands: Vec::new(),
            processing_time: Duration::ZERO,
        }
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Иванов, И.И. | 42 \n"), "Иванов И И 42");
        assert_eq!(clean_text("---"), "");
        assert_eq!(clean_text("abc"), "abc");
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        assert!(matches!(
            TextCleaner::new("("),
            Err(SegmentationError::Config { .. })
        ));
    }

    #[test]
    fn test_blank_cell_detection() {
        let page = page_with_cells(&[], &[Rect::new(10, 10, 2, 2)]);
        assert!(is_blank_cell(&page.enhanced, Rect::new(50, 50, 20, 20), 252));
        assert!(!is_blank_cell(&page.enhanced, Rect::new(5, 5, 20, 20), 252));
        assert!(is_blank_cell(&page.enhanced, Rect::new(500, 500, 20, 20), 252));
    }

    #[test]
    fn test_prepare_cell_upscales() {
        let page = page_with_cells(&[], &[]);
        let cell = prepare_cell(&page.clean, Rect::new(10, 10, 30, 15), 2).unwrap();
        assert_eq!(cell.dimensions(), (60, 30));
    }

    #[test]
    fn test_recognize_grid_writes_positions_and_skips_blank_cells() {
        let cells = [
            Rect::new(0, 0, 50, 40),
            Rect::new(60, 0, 50, 40),
            Rect::new(0, 50, 50, 40),
        ];
        let page = page_with_cells(&cells, &[Rect::new(10, 10, 5, 5), Rect::new(10, 60, 5, 5)]);

        let mut seen = Vec::new();
        let mut recognizer = |cell: &RgbImage| -> SegmentationResult<String> {
            seen.push(cell.dimensions());
            Ok(format!(" text#{} ", seen.len()))
        };
        let mut table = SparseTable::new();
        let summary = recognize_grid(
            &page,
            &mut recognizer,
            &mut table,
            &RecognitionConfig::default(),
        )
        .unwrap();

        assert_eq!(summary.recognized, 2);
        assert_eq!(summary.blank, 1);
        assert_eq!(table.get(0, 0), Some("text 1"));
        assert_eq!(table.get(0, 1), Some("text 2"));
        assert_eq!(table.get(1, 0), None);
        assert_eq!(seen, vec![(100, 80), (100, 80)]);
    }

    #[test]
    fn test_recognizer_failure_does_not_stop_the_page() {
        let cells = [Rect::new(0, 0, 50, 40), Rect::new(60, 0, 50, 40)];
        let page = page_with_cells(&cells, &[Rect::new(10, 10, 5, 5), Rect::new(70, 10, 5, 5)]);

        let mut calls = 0;
        let mut recognizer = |_: &RgbImage| -> SegmentationResult<String> {
            calls += 1;
            if calls == 1 {
                Err(SegmentationError::recognition("engine busy"))
            } else {
                Ok("42".to_string())
            }
        };
        let mut table = SparseTable::new();
        let summary = recognize_grid(
            &page,
            &mut recognizer,
            &mut table,
            &RecognitionConfig::default(),
        )
        .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.recognized, 1);
        assert_eq!(table.get(1, 0), Some("42"));
    }
}
