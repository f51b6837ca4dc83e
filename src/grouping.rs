//! Ordering of cell rectangles and clustering into table rows.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Sorts rectangles top-to-bottom, then left-to-right.
pub fn sort_cells(cells: &mut [Rect]) {
    cells.sort_by_key(|r| (r.y, r.x));
}

/// Cells sharing one row band, left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellGroup {
    pub cells: Vec<Rect>,
}

impl CellGroup {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rect> {
        self.cells.iter()
    }
}

/// Rows of cells, top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: Vec<CellGroup>,
}

impl Grid {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(CellGroup::len).sum()
    }

    /// All cells in row-major order.
    pub fn flatten(&self) -> Vec<Rect> {
        self.rows.iter().flat_map(|g| g.cells.iter().copied()).collect()
    }

    /// `(column, row, cell)` for every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Rect)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, group)| {
            group
                .cells
                .iter()
                .enumerate()
                .map(move |(column, rect)| (column, row, *rect))
        })
    }
}

/// Sorts `cells` and splits them into rows.
///
/// A row starts at its topmost cell; every following cell whose `y` is within
/// `tolerance` of that cell joins the row, the first one further away opens
/// the next row. Any two cells of a row therefore differ in `y` by at most
/// `tolerance`.
pub fn group_cells(cells: &[Rect], tolerance: i32) -> Grid {
    let mut sorted = cells.to_vec();
    sort_cells(&mut sorted);

    let mut rows: Vec<CellGroup> = Vec::new();
    let mut current = CellGroup::default();
    let mut anchor_y: Option<i32> = None;

    for rect in sorted {
        match anchor_y {
            Some(y) if (rect.y - y).abs() <= tolerance => current.cells.push(rect),
            Some(_) => {
                rows.push(std::mem::take(&mut current));
                current.cells.push(rect);
                anchor_y = Some(rect.y);
            }
            None => {
                current.cells.push(rect);
                anchor_y = Some(rect.y);
            }
        }
    }
    if !current.is_empty() {
        rows.push(current);
    }

    Grid { rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_breaks_ties_by_x() {
        let mut cells = vec![
            Rect::new(50, 10, 5, 5),
            Rect::new(10, 20, 5, 5),
            Rect::new(5, 10, 5, 5),
        ];
        sort_cells(&mut cells);
        assert_eq!(
            cells,
            vec![
                Rect::new(5, 10, 5, 5),
                Rect::new(50, 10, 5, 5),
                Rect::new(10, 20, 5, 5),
            ]
        );
    }

    #[test]
    fn test_grouping_splits_rows() {
        let cells = vec![
            Rect::new(100, 12, 40, 20),
            Rect::new(10, 10, 80, 20),
            Rect::new(10, 40, 80, 20),
            Rect::new(100, 41, 40, 20),
        ];
        let grid = group_cells(&cells, 5);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.rows[0].cells[0].x, 10);
        assert_eq!(grid.rows[0].cells[1].x, 100);
        assert_eq!(grid.rows[1].len(), 2);
        assert_eq!(grid.cell_count(), 4);
    }

    #[test]
    fn test_first_cell_opens_a_group_even_at_zero() {
        let grid = group_cells(&[Rect::new(0, 0, 10, 10), Rect::new(20, 3, 10, 10)], 5);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.rows[0].len(), 2);
    }

    #[test]
    fn test_drifting_rows_stay_within_tolerance() {
        let cells: Vec<Rect> = (0..6).map(|i| Rect::new(i * 20, i * 3, 10, 10)).collect();
        let grid = group_cells(&cells, 5);
        for row in &grid.rows {
            for a in row.iter() {
                for b in row.iter() {
                    assert!((a.y - b.y).abs() <= 5);
                }
            }
        }
        assert_eq!(grid.cell_count(), 6);
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let cells = vec![
            Rect::new(30, 101, 10, 10),
            Rect::new(0, 99, 10, 10),
            Rect::new(0, 0, 10, 10),
            Rect::new(15, 2, 10, 10),
            Rect::new(0, 50, 10, 10),
        ];
        let grid = group_cells(&cells, 5);
        assert_eq!(group_cells(&grid.flatten(), 5), grid);
    }

    #[test]
    fn test_cells_iterator_indices() {
        let grid = group_cells(
            &[
                Rect::new(0, 0, 10, 10),
                Rect::new(20, 0, 10, 10),
                Rect::new(0, 30, 10, 10),
            ],
            5,
        );
        let triples: Vec<(usize, usize)> = grid.cells().map(|(c, r, _)| (c, r)).collect();
        assert_eq!(triples, vec![(0, 0), (1, 0), (0, 1)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_cells(&[], 5).is_empty());
    }

    #[test]
    fn test_drifting_column_is_split_at_the_row_anchor() {
        // Each step is within tolerance of the previous cell, so chaining to
        // the previous cell would merge all four into one row.
        let cells: Vec<Rect> = [0, 4, 8, 12].iter().map(|&y| Rect::new(0, y, 10, 10)).collect();

        let grid = group_cells(&cells, 5);
        let rows: Vec<Vec<i32>> = grid
            .rows
            .iter()
            .map(|row| row.iter().map(|r| r.y).collect())
            .collect();
        assert_eq!(rows, vec![vec![0, 4], vec![8, 12]]);
    }
}
