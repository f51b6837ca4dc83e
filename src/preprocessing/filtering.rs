//! # Image Filtering Module
//!
//! This module provides the enhancement filters applied to a cropped page
//! (contrast stretch and unsharp mask) and the morphological operations used to
//! isolate ruling lines and merge blobs in binary masks.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{self, grayscale_dilate, grayscale_erode, Mask};
use std::time::Instant;
use tracing;

use super::types::{KernelShape, KernelSpec, MorphologicalOperation};

/// Applies the per-channel affine map `out = clamp(alpha * in + beta, 0, 255)`.
///
/// # Examples
///
/// ```
/// use table_segmentation::preprocessing::increase_contrast;
///
/// let page = image::RgbImage::from_pixel(4, 4, image::Rgb([100, 150, 250]));
/// let out = increase_contrast(&page, 1.2, -20.0);
/// assert_eq!(out.get_pixel(0, 0).0, [100, 160, 255]);
/// ```
pub fn increase_contrast(image: &RgbImage, alpha: f32, beta: f32) -> RgbImage {
    let start_time = Instant::now();
    let mut output = RgbImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(output.pixels_mut()) {
        *dst = Rgb(src.0.map(|c| saturate(alpha * c as f32 + beta)));
    }

    tracing::debug!(
        target: "table_segmentation",
        "Contrast enhancement completed in {}ms: alpha={:.2}, beta={:.1}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        alpha,
        beta,
        image.width(),
        image.height()
    );

    output
}

/// Unsharp mask: `out = 1.5 * in - 0.5 * blur(in)`, clamped to the pixel range.
///
/// `blur_sigma` is the standard deviation of the Gaussian blur.
pub fn increase_sharpness(image: &RgbImage, blur_sigma: f32) -> RgbImage {
    let start_time = Instant::now();
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    let blurred = gaussian_blur_f32(image, blur_sigma);
    let mut output = RgbImage::new(image.width(), image.height());
    for ((src, blur), dst) in image.pixels().zip(blurred.pixels()).zip(output.pixels_mut()) {
        let mut px = [0u8; 3];
        for c in 0..3 {
            px[c] = saturate(1.5 * src[c] as f32 - 0.5 * blur[c] as f32);
        }
        *dst = Rgb(px);
    }

    tracing::debug!(
        target: "table_segmentation",
        "Sharpness enhancement completed in {}ms: sigma={:.2}",
        start_time.elapsed().as_millis(),
        blur_sigma
    );

    output
}

#[inline]
fn saturate(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Largest kernel side `imageproc::morphology::Mask` accepts.
pub const MAX_KERNEL_SIDE: u32 = 511;

/// Footprint of a structuring element: 255 where the kernel is set.
///
/// The ellipse is inscribed in the `width x height` box row by row, the way
/// OpenCV's `getStructuringElement` builds it.
pub fn kernel_footprint(spec: KernelSpec) -> GrayImage {
    let width = spec.width.clamp(1, MAX_KERNEL_SIDE);
    let height = spec.height.clamp(1, MAX_KERNEL_SIDE);
    let mut footprint = GrayImage::new(width, height);
    let (anchor_x, anchor_y) = (width / 2, height / 2);

    for row in 0..height {
        let (from, to) = match spec.shape {
            KernelShape::Rect => (0, width),
            KernelShape::Cross if row == anchor_y => (0, width),
            KernelShape::Cross => (anchor_x, anchor_x + 1),
            KernelShape::Ellipse => ellipse_span(row, width, height),
        };
        for x in from..to {
            footprint.put_pixel(x, row, Luma([255]));
        }
    }
    footprint
}

fn ellipse_span(row: u32, width: u32, height: u32) -> (u32, u32) {
    let r = (height / 2) as f64;
    let c = (width / 2) as f64;
    if r == 0.0 {
        return (0, width);
    }
    let dy = row as f64 - r;
    if dy.abs() > r {
        return (0, 0);
    }
    let dx = (c * ((r * r - dy * dy) / (r * r)).max(0.0).sqrt()).round();
    let from = (c - dx).max(0.0) as u32;
    let to = ((c + dx + 1.0) as u32).min(width);
    (from, to.max(from))
}

/// `imageproc` mask for a kernel, anchored at its center.
pub fn kernel_mask(spec: KernelSpec) -> Mask {
    let footprint = kernel_footprint(spec);
    let (width, height) = footprint.dimensions();
    Mask::from_image(&footprint, (width / 2) as u8, (height / 2) as u8)
}

/// Applies a morphological operation with the given kernel.
pub fn apply_morphology(
    image: &GrayImage,
    operation: MorphologicalOperation,
    kernel: KernelSpec,
) -> GrayImage {
    let start_time = Instant::now();
    let mask = kernel_mask(kernel);
    let processed = match operation {
        MorphologicalOperation::Erosion => grayscale_erode(image, &mask),
        MorphologicalOperation::Dilation => grayscale_dilate(image, &mask),
    };

    tracing::debug!(
        target: "table_segmentation",
        "Morphological operation completed in {}ms: operation={:?}, kernel={:?} {}x{}",
        start_time.elapsed().as_millis(),
        operation,
        kernel.shape,
        kernel.width,
        kernel.height
    );

    processed
}

/// Erosion: each pixel becomes the minimum under the kernel. Pixels outside
/// the image do not take part, so borders are not eroded.
pub fn erode(image: &GrayImage, kernel: KernelSpec) -> GrayImage {
    apply_morphology(image, MorphologicalOperation::Erosion, kernel)
}

/// Dilation: each pixel becomes the maximum under the kernel.
pub fn dilate(image: &GrayImage, kernel: KernelSpec) -> GrayImage {
    apply_morphology(image, MorphologicalOperation::Dilation, kernel)
}

/// Dilation of a binary mask. Odd square rectangles use the chessboard
/// distance transform, other kernels fall back to [`dilate`].
pub fn dilate_binary(mask: &GrayImage, kernel: KernelSpec) -> GrayImage {
    let is_odd_square = kernel.shape == KernelShape::Rect
        && kernel.width == kernel.height
        && kernel.width % 2 == 1
        && kernel.width <= MAX_KERNEL_SIDE;
    if is_odd_square {
        morphology::dilate(mask, Norm::LInf, (kernel.width / 2) as u8)
    } else {
        dilate(mask, kernel)
    }
}
