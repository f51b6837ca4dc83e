//! # Page Resizing and Cropping Module
//!
//! This module normalizes a rasterized page to the working resolution and cuts
//! away the scan border. Orientation is kept: landscape pages are resized to
//! `target_width x target_height`, portrait pages to the transposed size, and
//! the crop region is transposed with them.

use image::{imageops::FilterType, DynamicImage, RgbImage};
use std::time::Instant;
use tracing;

use crate::errors::{SegmentationError, SegmentationResult};
use crate::geometry::Rect;

/// Page orientation decided by comparing width to height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn of(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Resizes a page to the target size, preserving its orientation, then crops
/// the configured interior region.
///
/// # Arguments
///
/// * `image` - The rasterized page
/// * `target_size` - `(width, height)` of a landscape page
/// * `crop` - Interior region of a landscape page; transposed for portrait pages
///
/// # Returns
///
/// The cropped RGB page, or `SegmentationError::InvalidImage` for a zero-size
/// input and `SegmentationError::Geometry` when the crop misses the page.
///
/// # Examples
///
/// ```
/// use table_segmentation::geometry::Rect;
/// use table_segmentation::preprocessing::resize_and_crop;
///
/// let page = image::DynamicImage::new_rgb8(400, 300);
/// let cropped = resize_and_crop(&page, (200, 150), Rect::new(5, 5, 190, 140))?;
/// assert_eq!(cropped.dimensions(), (190, 140));
/// # Ok::<(), table_segmentation::SegmentationError>(())
/// ```
pub fn resize_and_crop(
    image: &DynamicImage,
    target_size: (u32, u32),
    crop: Rect,
) -> SegmentationResult<RgbImage> {
    let start_time = Instant::now();
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(SegmentationError::invalid_image(format!(
            "cannot resize an empty {}x{} page",
            width, height
        )));
    }

    let orientation = Orientation::of(width, height);
    let (resize_w, resize_h, crop) = match orientation {
        Orientation::Landscape => (target_size.0, target_size.1, crop),
        Orientation::Portrait => (
            target_size.1,
            target_size.0,
            Rect::new(crop.y, crop.x, crop.height, crop.width),
        ),
    };

    let resized = image
        .resize_exact(resize_w, resize_h, FilterType::Triangle)
        .into_rgb8();

    let region = crop.clip_to(resize_w, resize_h).ok_or_else(|| {
        SegmentationError::geometry(format!(
            "crop region {:?} lies outside the {}x{} page",
            crop, resize_w, resize_h
        ))
    })?;

    let cropped = image::imageops::crop_imm(
        &resized,
        region.x as u32,
        region.y as u32,
        region.width,
        region.height,
    )
    .to_image();

    tracing::debug!(
        target: "table_segmentation",
        "Resized {}x{} {:?} page to {}x{} and cropped {:?} in {}ms",
        width,
        height,
        orientation,
        resize_w,
        resize_h,
        region,
        start_time.elapsed().as_millis()
    );

    Ok(cropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_page_keeps_orientation() {
        let page = DynamicImage::new_rgb8(800, 600);
        let cropped = resize_and_crop(&page, (400, 300), Rect::new(10, 10, 380, 280)).unwrap();
        assert_eq!(cropped.dimensions(), (380, 280));
    }

    #[test]
    fn test_portrait_page_transposes_target_and_crop() {
        let page = DynamicImage::new_rgb8(600, 800);
        let cropped = resize_and_crop(&page, (400, 300), Rect::new(10, 20, 380, 260)).unwrap();
        assert_eq!(cropped.dimensions(), (260, 380));
    }

    #[test]
    fn test_crop_is_clipped_to_page() {
        let page = DynamicImage::new_rgb8(800, 600);
        let cropped = resize_and_crop(&page, (400, 300), Rect::new(350, 250, 100, 100)).unwrap();
        assert_eq!(cropped.dimensions(), (50, 50));
    }

    #[test]
    fn test_crop_outside_page_is_geometry_error() {
        let page = DynamicImage::new_rgb8(800, 600);
        let result = resize_and_crop(&page, (400, 300), Rect::new(500, 10, 10, 10));
        assert!(matches!(result, Err(SegmentationError::Geometry { .. })));
    }

    #[test]
    fn test_empty_page_is_invalid_image() {
        let page = DynamicImage::new_rgb8(0, 0);
        let result = resize_and_crop(&page, (400, 300), Rect::new(0, 0, 10, 10));
        assert!(matches!(result, Err(SegmentationError::InvalidImage { .. })));
    }

    #[test]
    fn test_orientation_of_square_is_portrait() {
        assert_eq!(Orientation::of(100, 100), Orientation::Portrait);
        assert_eq!(Orientation::of(101, 100), Orientation::Landscape);
    }
}
