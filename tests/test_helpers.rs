//! # Test Helper Library
//!
//! Synthetic page drawing shared by the integration tests: ruled tables,
//! text-like ink blocks and colored stamps on white paper.

#![allow(dead_code)]

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect as DrawRect;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const STAMP_BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// Layout of a ruled table in page coordinates
#[derive(Debug, Clone, Copy)]
pub struct RuledTable {
    pub left: i32,
    pub top: i32,
    pub column_width: u32,
    pub row_height: u32,
    pub columns: u32,
    pub rows: u32,
    pub thickness: u32,
}

impl Default for RuledTable {
    fn default() -> Self {
        Self {
            left: 100,
            top: 100,
            column_width: 200,
            row_height: 80,
            columns: 3,
            rows: 3,
            thickness: 3,
        }
    }
}

impl RuledTable {
    pub fn width(&self) -> u32 {
        self.column_width * self.columns + self.thickness
    }

    pub fn height(&self) -> u32 {
        self.row_height * self.rows + self.thickness
    }

    /// Top-left corner of a cell's interior in page coordinates
    pub fn cell_origin(&self, column: u32, row: u32) -> (i32, i32) {
        (
            self.left + (column * self.column_width + self.thickness) as i32,
            self.top + (row * self.row_height + self.thickness) as i32,
        )
    }
}

/// Create a white page with the ruled table drawn in black
pub fn draw_ruled_table(width: u32, height: u32, table: &RuledTable) -> RgbImage {
    let mut page = RgbImage::from_pixel(width, height, WHITE);
    for row in 0..=table.rows {
        let y = table.top + (row * table.row_height) as i32;
        draw_filled_rect_mut(
            &mut page,
            DrawRect::at(table.left, y).of_size(table.width(), table.thickness),
            BLACK,
        );
    }
    for column in 0..=table.columns {
        let x = table.left + (column * table.column_width) as i32;
        draw_filled_rect_mut(
            &mut page,
            DrawRect::at(x, table.top).of_size(table.thickness, table.height()),
            BLACK,
        );
    }
    page
}

/// Draw a solid block standing in for a word
pub fn draw_ink(page: &mut RgbImage, x: i32, y: i32, width: u32, height: u32) {
    draw_filled_rect_mut(page, DrawRect::at(x, y).of_size(width, height), BLACK);
}

/// Draw a filled stamp disc
pub fn draw_stamp(page: &mut RgbImage, center: (i32, i32), radius: i32) {
    draw_filled_circle_mut(page, center, radius, STAMP_BLUE);
}

/// Create a binary mask with full-width horizontal lines at the given rows
pub fn create_horizontal_lines_mask(width: u32, height: u32, rows: &[u32]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for &y in rows {
        for x in 0..width {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    mask
}

/// Create a binary mask with full-height vertical lines at the given columns
pub fn create_vertical_lines_mask(width: u32, height: u32, columns: &[u32]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for &x in columns {
        for y in 0..height {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    mask
}
