//! Connected-component labelling of binary masks and biggest-blob extraction.
//!
//! Pixels at or above half intensity are foreground. Components are
//! 4-connected, and when two components share the largest area the one whose
//! first pixel comes earlier in raster order wins.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::time::Instant;
use tracing;

use crate::geometry::{Point2f, Rect};
use crate::preprocessing::{dilate_binary, KernelSpec};

const FOREGROUND_LEVEL: u8 = 128;

/// Label image plus per-label statistics. Label 0 is background.
#[derive(Debug, Clone)]
pub struct ComponentLabels {
    width: u32,
    height: u32,
    labels: Vec<u32>,
    areas: Vec<u64>,
    first_seen: Vec<usize>,
}

impl ComponentLabels {
    /// Number of foreground components.
    pub fn count(&self) -> usize {
        self.areas.len().saturating_sub(1)
    }

    pub fn area(&self, label: u32) -> u64 {
        if label == 0 {
            return 0;
        }
        self.areas.get(label as usize).copied().unwrap_or(0)
    }

    pub fn label_at(&self, x: u32, y: u32) -> u32 {
        self.labels[(y * self.width + x) as usize]
    }

    /// Label and area of the largest component, if any.
    pub fn largest(&self) -> Option<(u32, u64)> {
        (1..self.areas.len())
            .map(|l| (l as u32, self.areas[l], self.first_seen[l]))
            .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
            .map(|(label, area, _)| (label, area))
    }

    /// Binary mask (255 inside) of one component.
    pub fn mask_of(&self, label: u32) -> GrayImage {
        let mut mask = GrayImage::new(self.width, self.height);
        for (i, &l) in self.labels.iter().enumerate() {
            if l == label && label != 0 {
                let x = i as u32 % self.width;
                let y = i as u32 / self.width;
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        mask
    }

    /// Leftmost and rightmost pixel of a component on every row it touches.
    ///
    /// The convex hull of these points equals the hull of the whole component.
    pub fn row_extremes(&self, label: u32) -> Vec<Point2f> {
        let mut points = Vec::new();
        if label == 0 {
            return points;
        }
        for y in 0..self.height {
            let row = &self.labels[(y * self.width) as usize..((y + 1) * self.width) as usize];
            let first = row.iter().position(|&l| l == label);
            let last = row.iter().rposition(|&l| l == label);
            if let (Some(first), Some(last)) = (first, last) {
                points.push(Point2f::new(first as f32, y as f32));
                if last != first {
                    points.push(Point2f::new(last as f32, y as f32));
                }
            }
        }
        points
    }

    /// Axis-aligned bounding box of one component.
    pub fn bounding_rect(&self, label: u32) -> Option<Rect> {
        Rect::bounding(
            self.row_extremes(label)
                .into_iter()
                .map(|p| (p.x as i32, p.y as i32)),
        )
    }
}

/// Labels the 4-connected foreground components of a mask.
pub fn label_components(mask: &GrayImage) -> ComponentLabels {
    let (width, height) = mask.dimensions();
    let mut binary = GrayImage::new(width, height);
    for (src, dst) in mask.pixels().zip(binary.pixels_mut()) {
        *dst = Luma([if src[0] >= FOREGROUND_LEVEL { 255 } else { 0 }]);
    }

    let labelled = connected_components(&binary, Connectivity::Four, Luma([0u8]));
    let labels: Vec<u32> = labelled.pixels().map(|p| p[0]).collect();

    let max_label = labels.iter().copied().max().unwrap_or(0) as usize;
    let mut areas = vec![0u64; max_label + 1];
    let mut first_seen = vec![usize::MAX; max_label + 1];
    for (i, &label) in labels.iter().enumerate() {
        if label != 0 {
            let l = label as usize;
            areas[l] += 1;
            if first_seen[l] == usize::MAX {
                first_seen[l] = i;
            }
        }
    }

    ComponentLabels {
        width,
        height,
        labels,
        areas,
        first_seen,
    }
}

/// The largest connected component of a mask after dilation.
#[derive(Debug, Clone)]
pub struct Blob {
    /// 255 on the blob, 0 elsewhere
    pub mask: GrayImage,
    /// Pixel count of the dilated blob
    pub area: u64,
    /// Row extremes of the blob, enough to compute its hull
    pub outline_points: Vec<Point2f>,
}

/// Dilates a mask and returns its biggest connected component.
///
/// Returns `None` when the mask has no foreground pixel.
pub fn biggest_blob(mask: &GrayImage, dilate_kernel: KernelSpec) -> Option<Blob> {
    let start_time = Instant::now();
    let dilated = dilate_binary(mask, dilate_kernel);
    let labels = label_components(&dilated);
    let (label, area) = labels.largest()?;

    tracing::debug!(
        target: "table_segmentation",
        "Biggest blob search completed in {}ms: components={}, largest_area={}",
        start_time.elapsed().as_millis(),
        labels.count(),
        area
    );

    Some(Blob {
        mask: labels.mask_of(label),
        area,
        outline_points: labels.row_extremes(label),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(mask: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }

    #[test]
    fn test_label_two_components() {
        let mut mask = GrayImage::new(20, 10);
        fill(&mut mask, 1, 1, 3, 3);
        fill(&mut mask, 10, 2, 5, 4);
        let labels = label_components(&mask);
        assert_eq!(labels.count(), 2);
        let (label, area) = labels.largest().unwrap();
        assert_eq!(area, 20);
        assert_eq!(labels.label_at(12, 3), label);
        assert_eq!(labels.bounding_rect(label), Some(Rect::new(10, 2, 5, 4)));
    }

    #[test]
    fn test_diagonal_pixels_are_separate_components() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(0, 0, Luma([255]));
        mask.put_pixel(1, 1, Luma([255]));
        assert_eq!(label_components(&mask).count(), 2);
    }

    #[test]
    fn test_largest_tie_prefers_first_in_raster_order() {
        let mut mask = GrayImage::new(20, 10);
        fill(&mut mask, 12, 0, 2, 2);
        fill(&mut mask, 0, 5, 2, 2);
        let labels = label_components(&mask);
        let (label, _) = labels.largest().unwrap();
        assert_eq!(labels.label_at(12, 0), label);
    }

    #[test]
    fn test_row_extremes_cover_the_hull() {
        let mut mask = GrayImage::new(10, 10);
        fill(&mut mask, 2, 3, 4, 2);
        let labels = label_components(&mask);
        let (label, _) = labels.largest().unwrap();
        let points = labels.row_extremes(label);
        assert_eq!(points.len(), 4);
        assert!(points.contains(&Point2f::new(2.0, 3.0)));
        assert!(points.contains(&Point2f::new(5.0, 4.0)));
    }

    #[test]
    fn test_biggest_blob_merges_after_dilation() {
        let mut mask = GrayImage::new(30, 10);
        fill(&mut mask, 2, 2, 5, 5);
        fill(&mut mask, 8, 2, 5, 5);
        fill(&mut mask, 25, 2, 2, 2);
        let blob = biggest_blob(&mask, KernelSpec::rect(3, 3)).unwrap();
        // The two squares one pixel apart join into a single 13x7 block.
        assert_eq!(blob.area, 13 * 7);
        assert_eq!(blob.mask.get_pixel(7, 4)[0], 255);
        assert_eq!(blob.mask.get_pixel(25, 2)[0], 0);
    }

    #[test]
    fn test_empty_mask_has_no_blob() {
        let mask = GrayImage::new(10, 10);
        assert!(biggest_blob(&mask, KernelSpec::rect(3, 3)).is_none());
    }
}
