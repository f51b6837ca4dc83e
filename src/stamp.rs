//! # Stamp Suppression
//!
//! Finds the largest blob of "ink stamp" colored pixels on a page and paints it
//! white so that it does not disturb line extraction or recognition.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use std::time::Instant;
use tracing;

use crate::components::biggest_blob;
use crate::config::{HsvRange, StampConfig};
use crate::errors::{SegmentationError, SegmentationResult};
use crate::preprocessing::count_non_zero;

/// What the suppressor did to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampOutcome {
    /// No pixel fell inside the configured color range
    NoColoredPixels,
    /// A colored blob exists but is not larger than the minimum stamp area
    BelowThreshold { area: u64 },
    /// The blob was painted white
    Suppressed { area: u64 },
}

impl StampOutcome {
    pub fn was_suppressed(&self) -> bool {
        matches!(self, StampOutcome::Suppressed { .. })
    }
}

/// Converts an RGB pixel to 8-bit HSV: hue in `0..180`, saturation and value
/// in `0..=255`.
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> [u8; 3] {
    let [r, g, b] = pixel.0.map(|c| c as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };
    let mut h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    [
        ((h / 2.0).round() as u32 % 180) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        v as u8,
    ]
}

/// Binary mask of the pixels whose HSV value lies inside `range`.
pub fn color_mask(image: &RgbImage, range: &HsvRange) -> GrayImage {
    let mut mask = GrayImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(mask.pixels_mut()) {
        if range.contains(rgb_to_hsv(*src)) {
            *dst = Luma([255]);
        }
    }
    mask
}

/// Paints the largest stamp-colored blob white when it is big enough.
///
/// The page is left untouched for every outcome except `Suppressed`.
///
/// # Errors
///
/// Returns `SegmentationError::InvalidImage` for an empty image or an image
/// without color channels.
pub fn suppress_stamp(
    image: &mut DynamicImage,
    config: &StampConfig,
) -> SegmentationResult<StampOutcome> {
    let start_time = Instant::now();
    if image.width() == 0 || image.height() == 0 {
        return Err(SegmentationError::invalid_image(
            "cannot look for a stamp on an empty image",
        ));
    }
    if !image.color().has_color() {
        return Err(SegmentationError::invalid_image(format!(
            "stamp suppression needs a color image, got {:?}",
            image.color()
        )));
    }

    let outcome = match image {
        DynamicImage::ImageRgb8(rgb) => suppress_in_rgb(rgb, config),
        other => {
            let mut rgb = other.to_rgb8();
            let outcome = suppress_in_rgb(&mut rgb, config);
            if outcome.was_suppressed() {
                *other = DynamicImage::ImageRgb8(rgb);
            }
            outcome
        }
    };

    tracing::debug!(
        target: "table_segmentation",
        "Stamp suppression completed in {}ms: outcome={:?}",
        start_time.elapsed().as_millis(),
        outcome
    );

    Ok(outcome)
}

/// Same as [`suppress_stamp`] on an RGB buffer.
pub fn suppress_in_rgb(image: &mut RgbImage, config: &StampConfig) -> StampOutcome {
    let mask = color_mask(image, &config.color_range);
    if count_non_zero(&mask) == 0 {
        return StampOutcome::NoColoredPixels;
    }

    let Some(blob) = biggest_blob(&mask, config.dilate_kernel) else {
        return StampOutcome::NoColoredPixels;
    };
    if blob.area <= config.min_area {
        tracing::debug!(
            target: "table_segmentation",
            "Colored blob of {} pixels is below the stamp area of {}",
            blob.area,
            config.min_area
        );
        return StampOutcome::BelowThreshold { area: blob.area };
    }

    for (px, m) in image.pixels_mut().zip(blob.mask.pixels()) {
        if m[0] != 0 {
            *px = Rgb([255, 255, 255]);
        }
    }
    StampOutcome::Suppressed { area: blob.area }
}
