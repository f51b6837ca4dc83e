//! # Image Thresholding Module
//!
//! This module produces the binarized working copy of a page: grayscale
//! conversion, a light Gaussian blur against scanner noise, and an adaptive
//! Gaussian threshold that turns ink into set (255) pixels on a zero background.

use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use std::time::Instant;
use tracing;

use crate::config::PreprocessConfig;
use crate::errors::{SegmentationError, SegmentationResult};

/// Gaussian sigma matching a square neighbourhood of `block_size` pixels.
pub fn block_sigma(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Inverse adaptive threshold against a Gaussian-weighted local mean.
///
/// A pixel is set to 255 when it is at least `c` darker than the weighted mean
/// of its `block_size x block_size` neighbourhood, and to 0 otherwise, so dark
/// ink on light paper becomes foreground.
///
/// # Errors
///
/// Returns `SegmentationError::InvalidImage` for an empty image.
pub fn adaptive_threshold_inv(
    image: &GrayImage,
    block_size: u32,
    c: f32,
) -> SegmentationResult<GrayImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(SegmentationError::invalid_image(
            "empty image for adaptive thresholding",
        ));
    }

    let local_mean = gaussian_blur_f32(image, block_sigma(block_size));
    let mut binary = GrayImage::new(image.width(), image.height());
    for ((src, mean), dst) in image
        .pixels()
        .zip(local_mean.pixels())
        .zip(binary.pixels_mut())
    {
        let value = if (src[0] as f32) <= mean[0] as f32 - c {
            255u8
        } else {
            0u8
        };
        *dst = Luma([value]);
    }
    Ok(binary)
}

/// Builds the binarized working image from an enhanced page.
///
/// # Arguments
///
/// * `image` - Enhanced RGB page
/// * `config` - Blur sigma, threshold block size and constant
///
/// # Returns
///
/// A binary mask where ink is 255, or `SegmentationError::InvalidImage` for an
/// empty page.
pub fn binarize_page(image: &RgbImage, config: &PreprocessConfig) -> SegmentationResult<GrayImage> {
    let start_time = Instant::now();
    if image.width() == 0 || image.height() == 0 {
        return Err(SegmentationError::invalid_image(
            "empty page for binarization",
        ));
    }

    let gray = imageops::grayscale(image);
    let blurred = gaussian_blur_f32(&gray, config.noise_blur_sigma);
    let binary =
        adaptive_threshold_inv(&blurred, config.threshold_block_size, config.threshold_c)?;

    tracing::debug!(
        target: "table_segmentation",
        "Binarization completed in {}ms: block={}, c={:.1}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        config.threshold_block_size,
        config.threshold_c,
        image.width(),
        image.height()
    );

    Ok(binary)
}

/// Number of set (non-zero) pixels in a mask.
pub fn count_non_zero(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p[0] != 0).count() as u64
}
