//! # Shared Types for Image Preprocessing
//!
//! This module contains the shared types used across the preprocessing
//! sub-modules and by the stages that consume their output.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Structuring element shape for morphological operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelShape {
    /// Every element of the `width x height` box
    Rect,
    /// Center row and center column only
    Cross,
    /// Ellipse inscribed in the box
    Ellipse,
}

/// Structuring element description: `{shape, width, height}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub shape: KernelShape,
    pub width: u32,
    pub height: u32,
}

impl KernelSpec {
    pub const fn rect(width: u32, height: u32) -> Self {
        Self {
            shape: KernelShape::Rect,
            width,
            height,
        }
    }

    pub const fn ellipse(width: u32, height: u32) -> Self {
        Self {
            shape: KernelShape::Ellipse,
            width,
            height,
        }
    }
}

/// Types of morphological operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MorphologicalOperation {
    /// Erosion operation (shrinks bright regions)
    Erosion,
    /// Dilation operation (expands bright regions)
    Dilation,
}

/// Result of the enhancement chain applied to a cropped page.
#[derive(Debug, Clone)]
pub struct EnhancedPage {
    /// Resized and cropped page, no enhancement applied
    pub clean: RgbImage,
    /// Contrast- and sharpness-enhanced copy of `clean`
    pub enhanced: RgbImage,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of a skew estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct SkewEstimate {
    /// Mean segment angle in degrees, 0 when no segment was found
    pub angle_degrees: f32,
    /// Segments the estimate was computed from
    pub segments: Vec<LineSegment>,
}

/// A straight-line segment given by its two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub start: (i32, i32),
    pub end: (i32, i32),
}

impl LineSegment {
    /// Segment angle `atan2(dy, dx)` in radians.
    pub fn angle(&self) -> f64 {
        let dy = (self.end.1 - self.start.1) as f64;
        let dx = (self.end.0 - self.start.0) as f64;
        dy.atan2(dx)
    }

    pub fn length(&self) -> f64 {
        let dy = (self.end.1 - self.start.1) as f64;
        let dx = (self.end.0 - self.start.0) as f64;
        dx.hypot(dy)
    }
}
