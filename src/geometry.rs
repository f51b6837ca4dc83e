//! # Geometry Primitives
//!
//! Axis-aligned rectangles, rotated rectangles and points in image-pixel
//! coordinates, plus the convex hull and minimum-area rectangle used to frame
//! the table blob.

use serde::{Deserialize, Serialize};

use crate::errors::{SegmentationError, SegmentationResult};

/// A 2-D point with sub-pixel precision.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2f {
    pub x: f32,
    pub y: f32,
}

impl Point2f {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Width/height pair of a rotated rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size2f {
    pub width: f32,
    pub height: f32,
}

impl Size2f {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Axis-aligned rectangle in image-pixel coordinates.
///
/// `x`/`y` may be negative while a rectangle is being laid out; rectangles
/// handed to downstream stages are clipped to the image and never degenerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlap of two rectangles, `None` when they do not share any pixel.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    /// Clip to an image of the given dimensions.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Rect> {
        self.intersect(&Rect::new(0, 0, width, height))
    }

    /// Smallest rectangle covering every pixel position in `points`.
    pub fn bounding<I>(points: I) -> Option<Rect>
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut iter = points.into_iter();
        let (fx, fy) = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (fx, fy, fx, fy);
        for (x, y) in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Rect::new(
            min_x,
            min_y,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        ))
    }

    pub fn to_imageproc(&self) -> Option<imageproc::rect::Rect> {
        if self.is_degenerate() {
            return None;
        }
        Some(imageproc::rect::Rect::at(self.x, self.y).of_size(self.width, self.height))
    }
}

/// Minimum-area bounding box around a point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotatedRect {
    pub center: Point2f,
    pub size: Size2f,
    pub angle_degrees: f32,
}

impl RotatedRect {
    /// Builds a rotated rectangle, rejecting zero-area boxes.
    pub fn new(center: Point2f, size: Size2f, angle_degrees: f32) -> SegmentationResult<Self> {
        if !(size.area() > 0.0) {
            return Err(SegmentationError::geometry(format!(
                "rotated rectangle must have a positive area, got {}x{}",
                size.width, size.height
            )));
        }
        Ok(Self {
            center,
            size,
            angle_degrees,
        })
    }

    /// Corner points in drawing order.
    pub fn points(&self) -> [Point2f; 4] {
        let angle = self.angle_degrees.to_radians();
        let (sin, cos) = angle.sin_cos();
        let hw = self.size.width / 2.0;
        let hh = self.size.height / 2.0;
        let corner = |sx: f32, sy: f32| {
            Point2f::new(
                self.center.x + sx * hw * cos - sy * hh * sin,
                self.center.y + sx * hw * sin + sy * hh * cos,
            )
        };
        [
            corner(-1.0, 1.0),
            corner(-1.0, -1.0),
            corner(1.0, -1.0),
            corner(1.0, 1.0),
        ]
    }

    /// Integer axis-aligned rectangle enclosing all four corners.
    pub fn bounding_rect(&self) -> Rect {
        let pts = self.points();
        let min_x = pts.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor();
        let min_y = pts.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor();
        let max_x = pts
            .iter()
            .map(|p| p.x)
            .fold(f32::NEG_INFINITY, f32::max)
            .ceil();
        let max_y = pts
            .iter()
            .map(|p| p.y)
            .fold(f32::NEG_INFINITY, f32::max)
            .ceil();
        Rect::new(
            min_x as i32,
            min_y as i32,
            (max_x - min_x) as u32 + 1,
            (max_y - min_y) as u32 + 1,
        )
    }
}

/// Convex hull using Andrew's monotone chain, counter-clockwise order.
pub fn convex_hull(points: &[Point2f]) -> Vec<Point2f> {
    let mut pts: Vec<Point2f> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Point2f> = Vec::new();
    for p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], *p) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point2f> = Vec::new();
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], *p) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

#[inline]
fn cross(o: Point2f, a: Point2f, b: Point2f) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Minimum-area rotated rectangle around `points` (rotating calipers over the hull).
///
/// # Errors
///
/// Returns `SegmentationError::Geometry` for an empty point set or when every
/// point is collinear, since the resulting box has no area.
pub fn min_area_rect(points: &[Point2f]) -> SegmentationResult<RotatedRect> {
    if points.is_empty() {
        return Err(SegmentationError::geometry(
            "cannot bound an empty point set",
        ));
    }

    let hull = convex_hull(points);
    if hull.len() < 3 {
        return Err(SegmentationError::geometry(format!(
            "point set of {} points is degenerate (hull has {} vertices)",
            points.len(),
            hull.len()
        )));
    }

    let mut best: Option<(f32, RotatedRect)> = None;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len = dx.hypot(dy);
        if len <= f32::EPSILON {
            continue;
        }
        let (ux, uy) = (dx / len, dy / len);
        let (vx, vy) = (-uy, ux);

        let (mut min_u, mut max_u) = (f32::INFINITY, f32::NEG_INFINITY);
        let (mut min_v, mut max_v) = (f32::INFINITY, f32::NEG_INFINITY);
        for p in &hull {
            let (px, py) = (p.x - a.x, p.y - a.y);
            let u = px * ux + py * uy;
            let v = px * vx + py * vy;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let width = max_u - min_u;
        let height = max_v - min_v;
        let area = width * height;
        if best.as_ref().is_some_and(|(best_area, _)| *best_area <= area) {
            continue;
        }

        let mid_u = (min_u + max_u) / 2.0;
        let mid_v = (min_v + max_v) / 2.0;
        let center = Point2f::new(
            a.x + mid_u * ux + mid_v * vx,
            a.y + mid_u * uy + mid_v * vy,
        );
        let rect = RotatedRect {
            center,
            size: Size2f { width, height },
            angle_degrees: uy.atan2(ux).to_degrees(),
        };
        best = Some((area, rect));
    }

    match best {
        Some((_, rect)) => RotatedRect::new(rect.center, rect.size, rect.angle_degrees),
        None => Err(SegmentationError::geometry(
            "minimum-area rectangle has no valid edge",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_points(x0: f32, y0: f32, side: f32) -> Vec<Point2f> {
        vec![
            Point2f::new(x0, y0),
            Point2f::new(x0 + side, y0),
            Point2f::new(x0 + side, y0 + side),
            Point2f::new(x0, y0 + side),
            Point2f::new(x0 + side / 2.0, y0 + side / 2.0),
        ]
    }

    #[test]
    fn test_rect_intersection_and_clip() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.intersect(&Rect::new(10, 0, 5, 5)), None);
        assert_eq!(
            Rect::new(-5, -5, 20, 20).clip_to(8, 6),
            Some(Rect::new(0, 0, 8, 6))
        );
    }

    #[test]
    fn test_rect_bounding_points() {
        let rect = Rect::bounding(vec![(3, 4), (7, 2), (5, 9)]).unwrap();
        assert_eq!(rect, Rect::new(3, 2, 5, 8));
        assert!(Rect::bounding(Vec::<(i32, i32)>::new()).is_none());
    }

    #[test]
    fn test_rect_contains() {
        let outer = Rect::new(0, 0, 100, 50);
        assert!(outer.contains(&Rect::new(10, 10, 20, 20)));
        assert!(!outer.contains(&Rect::new(90, 10, 20, 20)));
        assert!(outer.contains_point(99, 49));
        assert!(!outer.contains_point(100, 49));
    }

    #[test]
    fn test_convex_hull_drops_interior_points() {
        let hull = convex_hull(&square_points(0.0, 0.0, 10.0));
        assert_eq!(hull.len(), 4);
    }

    #[test]
    fn test_min_area_rect_axis_aligned() {
        let rect = min_area_rect(&square_points(10.0, 20.0, 30.0)).unwrap();
        assert!((rect.size.area() - 900.0).abs() < 1e-2);
        assert!((rect.center.x - 25.0).abs() < 1e-3);
        assert!((rect.center.y - 35.0).abs() < 1e-3);
        let bounds = rect.bounding_rect();
        assert!(bounds.x <= 10 && bounds.y <= 20);
        assert!(bounds.right() >= 40 && bounds.bottom() >= 50);
    }

    #[test]
    fn test_min_area_rect_rotated() {
        // A 20x10 rectangle rotated by 30 degrees.
        let angle = 30f32.to_radians();
        let (s, c) = angle.sin_cos();
        let corners = [(0.0, 0.0), (20.0, 0.0), (20.0, 10.0), (0.0, 10.0)];
        let points: Vec<Point2f> = corners
            .iter()
            .map(|(x, y)| Point2f::new(x * c - y * s + 50.0, x * s + y * c + 50.0))
            .collect();
        let rect = min_area_rect(&points).unwrap();
        assert!((rect.size.area() - 200.0).abs() < 0.5);
    }

    #[test]
    fn test_min_area_rect_rejects_empty_and_collinear() {
        assert!(matches!(
            min_area_rect(&[]),
            Err(SegmentationError::Geometry { .. })
        ));
        let line: Vec<Point2f> = (0..10).map(|i| Point2f::new(i as f32, 3.0)).collect();
        assert!(matches!(
            min_area_rect(&line),
            Err(SegmentationError::Geometry { .. })
        ));
    }

    #[test]
    fn test_rotated_rect_rejects_zero_area() {
        let result = RotatedRect::new(
            Point2f::new(0.0, 0.0),
            Size2f {
                width: 10.0,
                height: 0.0,
            },
            0.0,
        );
        assert!(result.is_err());
    }
}
