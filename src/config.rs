//! # Segmentation Configuration
//!
//! One immutable configuration structure is built once per run and passed by
//! reference into every pipeline stage. The defaults are the tuned constants for
//! scans rasterized at 300 DPI. Every structure can be loaded from JSON (missing
//! fields fall back to their defaults) and validated before use.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::errors::{SegmentationError, SegmentationResult};
use crate::geometry::Rect;
use crate::preprocessing::types::{KernelShape, KernelSpec};
use crate::preprocessing::MAX_KERNEL_SIDE;

/// Resize, crop, enhancement and binarization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Target width of a landscape page (height for portrait pages)
    pub target_width: u32,
    /// Target height of a landscape page (width for portrait pages)
    pub target_height: u32,
    /// Interior region kept after resizing, in landscape orientation
    pub crop: Rect,
    /// Contrast gain
    pub contrast_alpha: f32,
    /// Contrast bias
    pub contrast_beta: f32,
    /// Gaussian sigma of the unsharp mask
    pub sharpen_sigma: f32,
    /// Gaussian sigma of the noise blur applied before binarization
    pub noise_blur_sigma: f32,
    /// Neighbourhood size of the adaptive threshold (odd)
    pub threshold_block_size: u32,
    /// Constant subtracted from the neighbourhood mean
    pub threshold_c: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_width: 2560,
            target_height: 1890,
            crop: Rect::new(20, 20, 2520, 1850),
            contrast_alpha: 1.2,
            contrast_beta: -20.0,
            sharpen_sigma: 3.0,
            noise_blur_sigma: 0.8,
            threshold_block_size: 15,
            threshold_c: 3.0,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> SegmentationResult<()> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(SegmentationError::config(
                "target_width and target_height must be greater than 0",
            ));
        }
        if self.crop.is_degenerate() || self.crop.x < 0 || self.crop.y < 0 {
            return Err(SegmentationError::config(format!(
                "crop region {:?} must be non-empty and start inside the page",
                self.crop
            )));
        }
        if self.crop.right() as u32 > self.target_width
            || self.crop.bottom() as u32 > self.target_height
        {
            return Err(SegmentationError::config(format!(
                "crop region {:?} exceeds the {}x{} target size",
                self.crop, self.target_width, self.target_height
            )));
        }
        if self.contrast_alpha <= 0.0 {
            return Err(SegmentationError::config(
                "contrast_alpha must be greater than 0",
            ));
        }
        if self.sharpen_sigma <= 0.0 || self.noise_blur_sigma <= 0.0 {
            return Err(SegmentationError::config(
                "blur sigmas must be greater than 0",
            ));
        }
        if self.threshold_block_size < 3 || self.threshold_block_size % 2 == 0 {
            return Err(SegmentationError::config(format!(
                "threshold_block_size must be odd and >= 3, got {}",
                self.threshold_block_size
            )));
        }
        Ok(())
    }
}

/// Inclusive HSV range on the 8-bit scale (hue 0..180, saturation/value 0..255)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| hsv[i] >= self.lower[i] && hsv[i] <= self.upper[i])
    }
}

/// Ink stamp detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampConfig {
    /// Color range considered ink
    pub color_range: HsvRange,
    /// Kernel used to merge nearby ink pixels into one blob
    pub dilate_kernel: KernelSpec,
    /// A blob must cover more pixels than this to be painted out
    pub min_area: u64,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            color_range: HsvRange {
                lower: [100, 50, 50],
                upper: [135, 255, 255],
            },
            dilate_kernel: KernelSpec::ellipse(11, 11),
            min_area: 35_000,
        }
    }
}

/// Morphological kernels isolating ruling lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineExtractionConfig {
    pub horizontal_erode: KernelSpec,
    pub vertical_erode: KernelSpec,
    pub vertical_dilate: KernelSpec,
}

impl Default for LineExtractionConfig {
    fn default() -> Self {
        Self {
            horizontal_erode: KernelSpec::rect(27, 1),
            vertical_erode: KernelSpec::rect(1, 38),
            vertical_dilate: KernelSpec::rect(2, 32),
        }
    }
}

/// Probabilistic Hough transform settings for skew estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskewConfig {
    /// Distance resolution of the accumulator in pixels
    pub rho: f32,
    /// Angle resolution of the accumulator in degrees
    pub theta_degrees: f32,
    /// Minimum accumulator votes before a line is traced
    pub vote_threshold: u32,
    /// Minimum segment length as a fraction of the image width
    pub min_line_length_ratio: f32,
    /// Maximum gap in pixels bridged while tracing a segment
    pub max_line_gap: u32,
    /// Upper bound on the number of returned segments
    pub max_segments: usize,
    /// Seed of the point shuffle, keeps results reproducible
    pub seed: u64,
}

impl Default for DeskewConfig {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta_degrees: 0.5,
            vote_threshold: 100,
            min_line_length_ratio: 1.0 / 6.0,
            max_line_gap: 5,
            max_segments: 4096,
            seed: 0x5eed,
        }
    }
}

/// Projection thresholds per axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Row threshold as a fraction of the profile maximum
    pub row_threshold_ratio: f64,
    /// Column maximum, as a fraction of the theoretical maximum, above which
    /// the reduced column threshold applies
    pub column_fill_ratio: f64,
    /// Reduced column threshold as a fraction of the profile maximum
    pub column_threshold_ratio: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            row_threshold_ratio: 0.1,
            column_fill_ratio: 0.8,
            column_threshold_ratio: 0.2,
        }
    }
}

/// Synthetic border layout settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    /// Kernel dilating the working image before the table blob search
    pub blob_dilate: KernelSpec,
    /// Minimum distance between two horizontal lines for a band
    pub min_band_gap: i32,
    /// Subtracted from the table frame's left edge to get the band's left edge
    pub band_left_offset: i32,
    /// Added to the table frame's width to get the band's width
    pub band_right_offset: i32,
    /// Stroke thickness of synthetic lines
    pub line_thickness: u32,
    /// Rectangles with `width <= min_cell_width` are noise
    pub min_cell_width: u32,
    /// Rectangles with `height <= min_cell_height` are noise
    pub min_cell_height: u32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            blob_dilate: KernelSpec::rect(3, 3),
            min_band_gap: 10,
            band_left_offset: -5,
            band_right_offset: -10,
            line_thickness: 4,
            min_cell_width: 6,
            min_cell_height: 3,
        }
    }
}

/// Row clustering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Maximum `y` distance between cells of the same row
    pub row_gap_tolerance: i32,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            row_gap_tolerance: 5,
        }
    }
}

/// Cell hand-off settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Cells are upscaled by this factor before recognition
    pub upscale_factor: u32,
    /// Channel value above which a pixel counts as paper
    pub white_level: u8,
    /// Characters matching this pattern are replaced by a space
    pub text_filter: String,
    /// Recognition language passed to the recognizer
    pub language: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            upscale_factor: 2,
            white_level: 252,
            text_filter: r"[^\p{L}\p{N}]+".to_string(),
            language: "rus".to_string(),
        }
    }
}

/// Complete configuration of the segmentation pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub preprocess: PreprocessConfig,
    pub stamp: StampConfig,
    pub lines: LineExtractionConfig,
    pub deskew: DeskewConfig,
    pub projection: ProjectionConfig,
    pub borders: BorderConfig,
    pub grouping: GroupingConfig,
    pub recognition: RecognitionConfig,
}

impl SegmentationConfig {
    /// Defaults with a different working resolution. The crop keeps the default
    /// 20 pixel margin on every side.
    pub fn with_page_size(width: u32, height: u32) -> Self {
        let mut config = Self::default();
        config.preprocess.target_width = width;
        config.preprocess.target_height = height;
        config.preprocess.crop = Rect::new(
            20,
            20,
            width.saturating_sub(40).max(1),
            height.saturating_sub(40).max(1),
        );
        config
    }

    /// Load a configuration from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> SegmentationResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SegmentationError::config(format!(
                "cannot read configuration '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: SegmentationConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> SegmentationResult<()> {
        self.preprocess.validate()?;

        for (name, kernel) in [
            ("stamp.dilate_kernel", &self.stamp.dilate_kernel),
            ("lines.horizontal_erode", &self.lines.horizontal_erode),
            ("lines.vertical_erode", &self.lines.vertical_erode),
            ("lines.vertical_dilate", &self.lines.vertical_dilate),
            ("borders.blob_dilate", &self.borders.blob_dilate),
        ] {
            if kernel.width == 0 || kernel.height == 0 {
                return Err(SegmentationError::config(format!(
                    "{} must have a non-zero size, got {}x{}",
                    name, kernel.width, kernel.height
                )));
            }
            if kernel.width > MAX_KERNEL_SIDE || kernel.height > MAX_KERNEL_SIDE {
                return Err(SegmentationError::config(format!(
                    "{} sides must be at most {}, got {}x{}",
                    name, MAX_KERNEL_SIDE, kernel.width, kernel.height
                )));
            }
        }

        let range = &self.stamp.color_range;
        if (0..3).any(|i| range.lower[i] > range.upper[i]) || range.upper[0] > 180 {
            return Err(SegmentationError::config(format!(
                "invalid stamp color range {:?}..{:?}",
                range.lower, range.upper
            )));
        }

        if self.deskew.rho <= 0.0 || self.deskew.theta_degrees <= 0.0 {
            return Err(SegmentationError::config(
                "deskew rho and theta must be greater than 0",
            ));
        }
        if self.deskew.vote_threshold == 0 {
            return Err(SegmentationError::config(
                "deskew vote_threshold must be greater than 0",
            ));
        }

        for (name, ratio) in [
            ("row_threshold_ratio", self.projection.row_threshold_ratio),
            ("column_fill_ratio", self.projection.column_fill_ratio),
            ("column_threshold_ratio", self.projection.column_threshold_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(SegmentationError::config(format!(
                    "projection {} must be within 0..=1, got {}",
                    name, ratio
                )));
            }
        }

        if self.borders.line_thickness == 0 {
            return Err(SegmentationError::config(
                "borders.line_thickness must be greater than 0",
            ));
        }
        if self.borders.min_band_gap <= 0 {
            return Err(SegmentationError::config(
                "borders.min_band_gap must be greater than 0",
            ));
        }
        if self.grouping.row_gap_tolerance < 0 {
            return Err(SegmentationError::config(
                "grouping.row_gap_tolerance cannot be negative",
            ));
        }
        if self.recognition.upscale_factor == 0 {
            return Err(SegmentationError::config(
                "recognition.upscale_factor must be greater than 0",
            ));
        }
        if let Err(e) = regex::Regex::new(&self.recognition.text_filter) {
            return Err(SegmentationError::config(format!(
                "recognition.text_filter is not a valid pattern: {}",
                e
            )));
        }

        Ok(())
    }
}

/// Log output settings for the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level for this crate's target
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Settings of the batch binary
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Directory holding rasterized page images
    pub input_dir: PathBuf,
    /// Directory receiving one delimited table per page
    pub output_dir: PathBuf,
    /// Optional JSON file overriding the segmentation defaults
    pub config_path: Option<PathBuf>,
    /// Number of pages processed concurrently
    pub workers: usize,
    pub logging: LoggingConfig,
    pub segmentation: SegmentationConfig,
}

impl AppConfig {
    /// Load configuration from environment variables, then apply positional
    /// arguments `<input_dir> <output_dir> [lang]` on top.
    pub fn from_env_and_args(args: &[String]) -> SegmentationResult<Self> {
        let config_path = env::var("TABLE_CONFIG_PATH").ok().map(PathBuf::from);
        let mut segmentation = match &config_path {
            Some(path) => SegmentationConfig::from_json_file(path)?,
            None => SegmentationConfig::default(),
        };

        let mut input_dir = env::var("TABLE_INPUT_DIR").ok().map(PathBuf::from);
        let mut output_dir = env::var("TABLE_OUTPUT_DIR").ok().map(PathBuf::from);
        if let Ok(lang) = env::var("TABLE_LANGUAGE") {
            segmentation.recognition.language = lang;
        }

        if let Some(arg) = args.first() {
            input_dir = Some(PathBuf::from(arg));
        }
        if let Some(arg) = args.get(1) {
            output_dir = Some(PathBuf::from(arg));
        }
        if let Some(lang) = args.get(2) {
            segmentation.recognition.language = lang.clone();
        }

        let workers = env::var("TABLE_WORKERS")
            .unwrap_or_else(|_| "4".to_string())
            .parse::<usize>()
            .map_err(|_| SegmentationError::config("TABLE_WORKERS must be a valid number"))?;

        let config = Self {
            input_dir: input_dir.ok_or_else(|| {
                SegmentationError::config(
                    "input directory is required (first argument or TABLE_INPUT_DIR)",
                )
            })?,
            output_dir: output_dir.ok_or_else(|| {
                SegmentationError::config(
                    "output directory is required (second argument or TABLE_OUTPUT_DIR)",
                )
            })?,
            config_path,
            workers,
            logging: LoggingConfig {
                level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            },
            segmentation,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SegmentationResult<()> {
        if self.workers == 0 {
            return Err(SegmentationError::config("workers must be greater than 0"));
        }
        if self.workers > 64 {
            return Err(SegmentationError::config(
                "workers cannot be greater than 64",
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(SegmentationError::config(format!(
                "LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                self.logging.format
            )));
        }
        self.segmentation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = SegmentationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.borders.band_left_offset, -5);
        assert_eq!(config.borders.band_right_offset, -10);
        assert_eq!(config.grouping.row_gap_tolerance, 5);
        assert_eq!(config.stamp.min_area, 35_000);
        assert_eq!(config.lines.horizontal_erode.shape, KernelShape::Rect);
    }

    #[test]
    fn test_invalid_crop_rejected() {
        let mut config = SegmentationConfig::default();
        config.preprocess.crop = Rect::new(20, 20, 3000, 1850);
        assert!(matches!(
            config.validate(),
            Err(SegmentationError::Config { .. })
        ));
    }

    #[test]
    fn test_invalid_kernel_rejected() {
        let mut config = SegmentationConfig::default();
        config.lines.vertical_erode = KernelSpec::rect(1, 0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("lines.vertical_erode"));
    }

    #[test]
    fn test_oversized_kernel_rejected() {
        let mut config = SegmentationConfig::default();
        config.stamp.dilate_kernel = KernelSpec::ellipse(512, 11);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stamp.dilate_kernel"));

        config.stamp.dilate_kernel = KernelSpec::ellipse(511, 11);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_text_filter_rejected() {
        let mut config = SegmentationConfig::default();
        config.recognition.text_filter = "[unclosed".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hsv_range_contains() {
        let range = StampConfig::default().color_range;
        assert!(range.contains([120, 255, 255]));
        assert!(!range.contains([0, 255, 255]));
        assert!(!range.contains([120, 10, 255]));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "grouping": {{ "row_gap_tolerance": 8 }}, "borders": {{ "min_band_gap": 12 }} }}"#
        )
        .unwrap();

        let config = SegmentationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.grouping.row_gap_tolerance, 8);
        assert_eq!(config.borders.min_band_gap, 12);
        assert_eq!(config.borders.line_thickness, 4);
        assert_eq!(config.preprocess, PreprocessConfig::default());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            SegmentationConfig::from_json_file(file.path()),
            Err(SegmentationError::Config { .. })
        ));
    }
}
