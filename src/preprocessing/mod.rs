//! # Image Preprocessing Module
//!
//! This module prepares a rasterized page for structural analysis.
//!
//! The module is organized into focused sub-modules:
//! - `cropping`: Orientation-preserving resize and border crop
//! - `filtering`: Contrast and sharpness enhancement, morphological operations
//! - `thresholding`: Adaptive binarization of the working copy
//! - `deskewing`: Skew estimation and uniform rotation of working images
//! - `types`: Shared types

pub mod cropping;
pub mod deskewing;
pub mod filtering;
pub mod thresholding;
pub mod types;

use image::DynamicImage;
use std::time::Instant;

use crate::config::PreprocessConfig;
use crate::errors::SegmentationResult;

// Re-export commonly used types and functions for convenience
pub use types::{
    EnhancedPage, KernelShape, KernelSpec, LineSegment, MorphologicalOperation, SkewEstimate,
};

pub use cropping::{resize_and_crop, Orientation};
pub use deskewing::{detect_segments, estimate_skew, rotate_all, rotate_mask, rotate_rgb};
pub use filtering::{
    apply_morphology, dilate, dilate_binary, erode, increase_contrast, increase_sharpness,
    kernel_footprint, kernel_mask, MAX_KERNEL_SIDE,
};
pub use thresholding::{adaptive_threshold_inv, binarize_page, count_non_zero};

/// Runs resize, crop, contrast and sharpness enhancement on a raw page.
///
/// The returned `clean` image is the cropped page before enhancement and is the
/// one later handed to text recognition.
pub fn enhance_page(
    image: &DynamicImage,
    config: &PreprocessConfig,
) -> SegmentationResult<EnhancedPage> {
    let start_time = Instant::now();
    let clean = resize_and_crop(
        image,
        (config.target_width, config.target_height),
        config.crop,
    )?;
    let contrasted = increase_contrast(&clean, config.contrast_alpha, config.contrast_beta);
    let enhanced = increase_sharpness(&contrasted, config.sharpen_sigma);

    Ok(EnhancedPage {
        clean,
        enhanced,
        processing_time_ms: start_time.elapsed().as_millis() as u32,
    })
}
