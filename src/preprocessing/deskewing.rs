//! # Image Deskewing Module
//!
//! This module estimates page skew from the horizontal ruling-line mask and
//! rotates every working image of a page by the same angle.
//!
//! Straight segments are found with a progressive probabilistic Hough
//! transform: set pixels are visited in a seeded random order, each one votes
//! in the accumulator, and as soon as a bin reaches the vote threshold the
//! corresponding line is traced through the mask in both directions. Traced
//! pixels are removed from the mask, and when the traced segment is long enough
//! their votes are withdrawn as well.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::Instant;
use tracing;

use super::types::{LineSegment, SkewEstimate};
use crate::config::DeskewConfig;

const FIXED_SHIFT: u32 = 16;

/// Detects straight line segments in a binary mask.
///
/// # Arguments
///
/// * `mask` - Binary mask, any non-zero pixel is a candidate point
/// * `config` - Accumulator resolution, vote threshold, gap and length limits
///
/// # Returns
///
/// Segments in detection order, at most `config.max_segments` of them.
pub fn detect_segments(mask: &GrayImage, config: &DeskewConfig) -> Vec<LineSegment> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let (w, h) = (width as i64, height as i64);

    let theta = (config.theta_degrees as f64).to_radians();
    let rho = config.rho as f64;
    let irho = 1.0 / rho;
    let num_angle = ((std::f64::consts::PI / theta).round() as usize).max(1);
    let num_rho = (((w + h) * 2 + 1) as f64 / rho).round() as i64;
    let rho_offset = (num_rho - 1) / 2;
    let min_length = (config.min_line_length_ratio as f64 * width as f64).round() as i64;
    let max_gap = config.max_line_gap as i64;

    let trig: Vec<(f64, f64)> = (0..num_angle)
        .map(|n| {
            let angle = n as f64 * theta;
            (angle.cos() * irho, angle.sin() * irho)
        })
        .collect();

    let mut accumulator = vec![0i32; num_angle * num_rho as usize];
    let mut remaining = vec![false; (width * height) as usize];
    let mut points = Vec::new();
    for (x, y, px) in mask.enumerate_pixels() {
        if px[0] != 0 {
            remaining[(y * width + x) as usize] = true;
            points.push((x as i64, y as i64));
        }
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    points.shuffle(&mut rng);

    let bin = |n: usize, x: i64, y: i64| -> usize {
        let (cos, sin) = trig[n];
        let r = (x as f64 * cos + y as f64 * sin).round() as i64 + rho_offset;
        n * num_rho as usize + r.clamp(0, num_rho - 1) as usize
    };

    let mut segments = Vec::new();
    for &(px, py) in &points {
        if !remaining[(py * w + px) as usize] {
            continue;
        }

        let mut max_votes = config.vote_threshold as i32 - 1;
        let mut max_n = 0usize;
        for n in 0..num_angle {
            let cell = &mut accumulator[bin(n, px, py)];
            *cell += 1;
            if *cell > max_votes {
                max_votes = *cell;
                max_n = n;
            }
        }
        if max_votes < config.vote_threshold as i32 {
            continue;
        }

        // Direction of the winning line, stepping one pixel along its major axis
        let a = -trig[max_n].1;
        let b = trig[max_n].0;
        let half = 1i64 << (FIXED_SHIFT - 1);
        let (x_major, x0, y0, dx0, dy0) = if a.abs() > b.abs() {
            let dy0 = (b * (1i64 << FIXED_SHIFT) as f64 / a.abs()).round() as i64;
            (true, px, (py << FIXED_SHIFT) + half, if a > 0.0 { 1 } else { -1 }, dy0)
        } else {
            let dx0 = (a * (1i64 << FIXED_SHIFT) as f64 / b.abs()).round() as i64;
            (false, (px << FIXED_SHIFT) + half, py, dx0, if b > 0.0 { 1 } else { -1 })
        };
        let to_pixel = |x: i64, y: i64| -> (i64, i64) {
            if x_major {
                (x, y >> FIXED_SHIFT)
            } else {
                (x >> FIXED_SHIFT, y)
            }
        };

        let mut ends = [(px, py); 2];
        for (k, end) in ends.iter_mut().enumerate() {
            let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
            let (mut x, mut y) = (x0, y0);
            let mut gap = 0;
            loop {
                let (cx, cy) = to_pixel(x, y);
                if cx < 0 || cx >= w || cy < 0 || cy >= h {
                    break;
                }
                if remaining[(cy * w + cx) as usize] {
                    gap = 0;
                    *end = (cx, cy);
                } else {
                    gap += 1;
                    if gap > max_gap {
                        break;
                    }
                }
                x += dx;
                y += dy;
            }
        }

        let good_line =
            (ends[1].0 - ends[0].0).abs() >= min_length || (ends[1].1 - ends[0].1).abs() >= min_length;

        for (k, end) in ends.iter().enumerate() {
            let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
            let (mut x, mut y) = (x0, y0);
            loop {
                let (cx, cy) = to_pixel(x, y);
                if cx < 0 || cx >= w || cy < 0 || cy >= h {
                    break;
                }
                let idx = (cy * w + cx) as usize;
                if remaining[idx] {
                    if good_line {
                        for n in 0..num_angle {
                            accumulator[bin(n, cx, cy)] -= 1;
                        }
                    }
                    remaining[idx] = false;
                }
                if (cx, cy) == *end {
                    break;
                }
                x += dx;
                y += dy;
            }
        }

        if good_line {
            segments.push(LineSegment {
                start: (ends[0].0 as i32, ends[0].1 as i32),
                end: (ends[1].0 as i32, ends[1].1 as i32),
            });
            if segments.len() >= config.max_segments {
                break;
            }
        }
    }

    segments
}

/// Estimates the page skew as the mean angle of the segments detected in the
/// horizontal-line mask. No segments means no skew.
pub fn estimate_skew(horizontal_mask: &GrayImage, config: &DeskewConfig) -> SkewEstimate {
    let start_time = Instant::now();
    let segments = detect_segments(horizontal_mask, config);

    let angle_degrees = if segments.is_empty() {
        tracing::debug!(
            target: "table_segmentation",
            "No line segments found in {}x{} mask, assuming zero skew",
            horizontal_mask.width(),
            horizontal_mask.height()
        );
        0.0
    } else {
        let mean = segments.iter().map(LineSegment::angle).sum::<f64>() / segments.len() as f64;
        mean.to_degrees() as f32
    };

    tracing::debug!(
        target: "table_segmentation",
        "Skew estimation completed in {}ms: angle={:.3}°, segments={}",
        start_time.elapsed().as_millis(),
        angle_degrees,
        segments.len()
    );

    SkewEstimate {
        angle_degrees,
        segments,
    }
}

/// Rotates a color image about its center so that a line tilted by
/// `angle_degrees` becomes horizontal. Uncovered corners are filled white.
pub fn rotate_rgb(image: &RgbImage, angle_degrees: f32) -> RgbImage {
    if angle_degrees == 0.0 {
        return image.clone();
    }
    rotate_about_center(
        image,
        -angle_degrees.to_radians(),
        Interpolation::Bicubic,
        Rgb([255, 255, 255]),
    )
}

/// Same rotation as [`rotate_rgb`] for single-channel masks, filled with zero.
pub fn rotate_mask(mask: &GrayImage, angle_degrees: f32) -> GrayImage {
    if angle_degrees == 0.0 {
        return mask.clone();
    }
    rotate_about_center(
        mask,
        -angle_degrees.to_radians(),
        Interpolation::Bicubic,
        Luma([0]),
    )
}

/// Applies one rotation to every working image of a page so that their pixel
/// grids stay aligned.
pub fn rotate_all(angle_degrees: f32, color: &mut [&mut RgbImage], masks: &mut [&mut GrayImage]) {
    let start_time = Instant::now();
    if angle_degrees == 0.0 {
        return;
    }
    for image in color.iter_mut() {
        **image = rotate_rgb(image, angle_degrees);
    }
    for mask in masks.iter_mut() {
        **mask = rotate_mask(mask, angle_degrees);
    }

    tracing::debug!(
        target: "table_segmentation",
        "Rotated {} color and {} mask images by {:.3}° in {}ms",
        color.len(),
        masks.len(),
        angle_degrees,
        start_time.elapsed().as_millis()
    );
}
