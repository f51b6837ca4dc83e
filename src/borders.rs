//! # Border Synthesis
//!
//! Rebuilds a clean cell grid from the detected ruling-line positions. Every
//! pair of neighbouring horizontal lines far enough apart forms a band spanning
//! the table frame; each band gets a rectangular outline and a vertical stroke
//! at every column separator found inside it. The contours of that synthetic
//! pattern are the cells.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::find_contours;
use imageproc::drawing::{draw_filled_rect_mut, Canvas};
use std::time::Instant;
use tracing;

use crate::components::biggest_blob;
use crate::config::{BorderConfig, ProjectionConfig};
use crate::errors::SegmentationResult;
use crate::geometry::{min_area_rect, Rect, RotatedRect};
use crate::grouping::sort_cells;
use crate::projection::{find_line_positions, Axis};

/// Finds the table frame: the minimum-area rectangle around the largest blob
/// of the dilated working image.
///
/// Returns `Ok(None)` when the working image is blank.
///
/// # Errors
///
/// `SegmentationError::Geometry` when the blob has no area.
pub fn locate_table_frame(
    working: &GrayImage,
    config: &BorderConfig,
) -> SegmentationResult<Option<RotatedRect>> {
    let start_time = Instant::now();
    let Some(blob) = biggest_blob(working, config.blob_dilate) else {
        return Ok(None);
    };
    let frame = min_area_rect(&blob.outline_points)?;

    tracing::debug!(
        target: "table_segmentation",
        "Table frame located in {}ms: center=({:.1}, {:.1}), size={:.1}x{:.1}, angle={:.2}°",
        start_time.elapsed().as_millis(),
        frame.center.x,
        frame.center.y,
        frame.size.width,
        frame.size.height,
        frame.angle_degrees
    );

    Ok(Some(frame))
}

/// Band rectangles between neighbouring horizontal line positions.
///
/// Pairs closer than `min_band_gap` are skipped. The horizontal extent comes
/// from the table frame adjusted by the configured offsets, and every band is
/// clipped to the image.
pub fn band_rects(
    row_positions: &[i32],
    frame: Rect,
    image_size: (u32, u32),
    config: &BorderConfig,
) -> Vec<Rect> {
    let x = frame.x - config.band_left_offset;
    let width = frame.width as i32 + config.band_right_offset;
    if width <= 0 {
        return Vec::new();
    }

    row_positions
        .windows(2)
        .filter(|pair| pair[1] - pair[0] >= config.min_band_gap)
        .filter_map(|pair| {
            Rect::new(x, pair[0], width as u32, (pair[1] - pair[0]) as u32)
                .clip_to(image_size.0, image_size.1)
        })
        .collect()
}

/// A band with the column separators found inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub rect: Rect,
    /// Separator positions relative to `rect.x`
    pub columns: Vec<i32>,
}

/// Synthetic grid of a page.
#[derive(Debug, Clone)]
pub struct BorderLayout {
    /// Synthetic line drawing, 255 on strokes
    pub pattern: GrayImage,
    pub bands: Vec<Band>,
    /// Cell rectangles sorted top-to-bottom, left-to-right, frame and noise removed
    pub cells: Vec<Rect>,
}

/// Draws the band grid and extracts the cell rectangles from it.
pub fn synthesize_borders(
    bands: &[Rect],
    vertical_mask: &GrayImage,
    config: &BorderConfig,
    projection: &ProjectionConfig,
) -> BorderLayout {
    let start_time = Instant::now();
    let (width, height) = vertical_mask.dimensions();
    let mut pattern = GrayImage::new(width, height);

    let bands: Vec<Band> = bands
        .iter()
        .filter_map(|rect| rect.clip_to(width, height))
        .map(|rect| {
            let roi = image::imageops::crop_imm(
                vertical_mask,
                rect.x as u32,
                rect.y as u32,
                rect.width,
                rect.height,
            )
            .to_image();
            Band {
                rect,
                columns: find_line_positions(&roi, Axis::Columns, projection),
            }
        })
        .collect();

    for band in &bands {
        draw_band(&mut pattern, band, config.line_thickness, Luma([255]));
    }

    let mut cells: Vec<Rect> = find_contours::<i32>(&pattern)
        .iter()
        .filter_map(|contour| Rect::bounding(contour.points.iter().map(|p| (p.x, p.y))))
        .collect();
    let contour_count = cells.len();

    sort_cells(&mut cells);
    if let Some(frame_index) = largest_index(&cells) {
        cells.remove(frame_index);
    }
    cells.retain(|r| r.width > config.min_cell_width && r.height > config.min_cell_height);

    tracing::debug!(
        target: "table_segmentation",
        "Border synthesis completed in {}ms: bands={}, contours={}, cells={}",
        start_time.elapsed().as_millis(),
        bands.len(),
        contour_count,
        cells.len()
    );

    BorderLayout {
        pattern,
        bands,
        cells,
    }
}

/// Paints the synthetic grid white on a page image so ruling lines do not
/// reach text recognition.
pub fn erase_grid_lines(image: &mut RgbImage, layout: &BorderLayout, thickness: u32) {
    for band in &layout.bands {
        draw_band(image, band, thickness, Rgb([255, 255, 255]));
    }
}

fn largest_index(cells: &[Rect]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (i, rect) in cells.iter().enumerate() {
        if best.map_or(true, |(_, area)| rect.area() > area) {
            best = Some((i, rect.area()));
        }
    }
    best.map(|(i, _)| i)
}

/// Outline of the band plus a vertical stroke at every column. Column strokes
/// stay inside the band.
fn draw_band<C>(canvas: &mut C, band: &Band, thickness: u32, color: C::Pixel)
where
    C: Canvas,
{
    let t = thickness.max(1) as i32;
    let half = t / 2;
    let rect = band.rect;
    let (x0, y0) = (rect.x, rect.y);
    let (x1, y1) = (rect.right() - 1, rect.bottom() - 1);
    let span_w = (x1 - x0 + t) as u32;
    let span_h = (y1 - y0 + t) as u32;

    let edges = [
        Rect::new(x0 - half, y0 - half, span_w, t as u32),
        Rect::new(x0 - half, y1 - half, span_w, t as u32),
        Rect::new(x0 - half, y0 - half, t as u32, span_h),
        Rect::new(x1 - half, y0 - half, t as u32, span_h),
    ];
    for edge in edges {
        fill(canvas, edge, color);
    }

    for &column in &band.columns {
        let stroke = Rect::new(x0 + column - half, y0, t as u32, rect.height);
        if let Some(stroke) = stroke.intersect(&rect) {
            fill(canvas, stroke, color);
        }
    }
}

fn fill<C: Canvas>(canvas: &mut C, rect: Rect, color: C::Pixel) {
    if let Some(rect) = rect.to_imageproc() {
        draw_filled_rect_mut(canvas, rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Rect {
        Rect::new(20, 10, 200, 150)
    }

    #[test]
    fn test_band_between_lines_twenty_pixels_apart() {
        let config = BorderConfig::default();
        let bands = band_rects(&[30, 50], frame(), (300, 200), &config);
        assert_eq!(bands, vec![Rect::new(25, 30, 190, 20)]);
    }

    #[test]
    fn test_close_lines_do_not_form_a_band() {
        let config = BorderConfig::default();
        let bands = band_rects(&[30, 35, 60, 61], frame(), (300, 200), &config);
        assert_eq!(bands, vec![Rect::new(25, 35, 190, 25)]);
    }

    #[test]
    fn test_bands_are_clipped_to_the_image() {
        let config = BorderConfig::default();
        let bands = band_rects(&[10, 40], Rect::new(150, 0, 200, 100), (300, 100), &config);
        assert_eq!(bands, vec![Rect::new(155, 10, 145, 30)]);
    }

    #[test]
    fn test_band_without_columns_is_one_full_width_cell() {
        let vertical = GrayImage::new(300, 200);
        let band = Rect::new(20, 40, 200, 60);
        let layout = synthesize_borders(
            &[band],
            &vertical,
            &BorderConfig::default(),
            &ProjectionConfig::default(),
        );
        assert_eq!(layout.bands[0].columns, Vec::<i32>::new());
        assert_eq!(layout.cells.len(), 1);
        let cell = layout.cells[0];
        assert!(band.contains(&cell));
        assert!(cell.width + 6 >= band.width);
        assert!(cell.height + 6 >= band.height);
    }

    #[test]
    fn test_column_separators_split_the_band() {
        let mut vertical = GrayImage::new(300, 200);
        for y in 40..100 {
            vertical.put_pixel(100, y, Luma([255]));
            vertical.put_pixel(160, y, Luma([255]));
        }
        let band = Rect::new(20, 40, 200, 60);
        let layout = synthesize_borders(
            &[band],
            &vertical,
            &BorderConfig::default(),
            &ProjectionConfig::default(),
        );
        assert_eq!(layout.bands[0].columns, vec![80, 140]);
        assert_eq!(layout.cells.len(), 3);
        let xs: Vec<i32> = layout.cells.iter().map(|c| c.x).collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_erase_grid_lines_paints_white() {
        let mut page = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let layout = BorderLayout {
            pattern: GrayImage::new(100, 100),
            bands: vec![Band {
                rect: Rect::new(10, 10, 50, 30),
                columns: vec![25],
            }],
            cells: Vec::new(),
        };
        erase_grid_lines(&mut page, &layout, 4);
        assert_eq!(page.get_pixel(30, 10).0, [255, 255, 255]);
        assert_eq!(page.get_pixel(35, 20).0, [255, 255, 255]);
        assert_eq!(page.get_pixel(20, 20).0, [0, 0, 0]);
    }

    #[test]
    fn test_blank_working_image_has_no_frame() {
        let working = GrayImage::new(50, 50);
        assert_eq!(locate_table_frame(&working, &BorderConfig::default()).unwrap(), None);
    }

    #[test]
    fn test_frame_of_a_rectangle_outline() {
        let mut working = GrayImage::new(200, 150);
        for x in 20..180 {
            working.put_pixel(x, 20, Luma([255]));
            working.put_pixel(x, 120, Luma([255]));
        }
        for y in 20..121 {
            working.put_pixel(20, y, Luma([255]));
            working.put_pixel(179, y, Luma([255]));
        }
        let frame = locate_table_frame(&working, &BorderConfig::default())
            .unwrap()
            .unwrap();
        let bounds = frame.bounding_rect();
        assert!((bounds.x - 19).abs() <= 1);
        assert!((bounds.width as i32 - 162).abs() <= 2);
    }
}
