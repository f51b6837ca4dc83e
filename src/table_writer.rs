//! # Sparse Table Writer
//!
//! Collects `(column, row, text)` cells in any order and serializes them as
//! CSV through the `csv` crate. Missing cells become empty fields, missing
//! rows become records with a single empty field.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use crate::errors::{SegmentationError, SegmentationResult};

/// Receiver of recognized cell text.
pub trait TableWriter {
    /// Stores `text` at `(column, row)`. Empty text is ignored.
    fn set_cell(&mut self, column: usize, row: usize, text: &str);
}

/// Table backed by an ordered map keyed by `(row, column)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseTable {
    cells: BTreeMap<(usize, usize), String>,
}

impl SparseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: usize, row: usize) -> Option<&str> {
        self.cells.get(&(row, column)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of rows up to and including the last non-empty one.
    pub fn row_count(&self) -> usize {
        self.cells
            .keys()
            .next_back()
            .map(|(row, _)| row + 1)
            .unwrap_or(0)
    }

    /// Rows padded with empty fields. Each row ends at its last stored cell.
    fn records(&self) -> Vec<Vec<&str>> {
        let mut records: Vec<Vec<&str>> = vec![Vec::new(); self.row_count()];
        for (&(row, column), text) in &self.cells {
            let record = &mut records[row];
            if record.len() <= column {
                record.resize(column + 1, "");
            }
            record[column] = text.as_str();
        }
        records
    }

    fn write_records<W: io::Write>(&self, writer: &mut csv::Writer<W>) -> SegmentationResult<()> {
        for record in self.records() {
            if record.is_empty() {
                writer.write_record([""])?;
            } else {
                writer.write_record(&record)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Serializes the table with the given field delimiter.
    pub fn to_delimited(&self, delimiter: u8) -> SegmentationResult<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_writer(vec![]);
        self.write_records(&mut writer)?;

        let bytes = writer.into_inner().map_err(|e| SegmentationError::Io {
            message: e.to_string(),
        })?;
        String::from_utf8(bytes).map_err(|e| SegmentationError::Io {
            message: e.to_string(),
        })
    }

    /// Writes the comma-delimited table to `path`, replacing any existing file.
    pub fn dump(&self, path: impl AsRef<Path>) -> SegmentationResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b',')
            .flexible(true)
            .from_path(path)?;
        self.write_records(&mut writer)
    }
}

impl TableWriter for SparseTable {
    fn set_cell(&mut self, column: usize, row: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        self.cells.insert((row, column), text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parses CSV text back into rows of fields
    fn read_back(text: &str, delimiter: u8) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes())
            .records()
            .map(|record| record.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_sparse_layout() {
        let mut table = SparseTable::new();
        table.set_cell(2, 0, "c");
        table.set_cell(0, 0, "a");
        table.set_cell(1, 2, "x");
        let text = table.to_delimited(b',').unwrap();
        assert!(text.starts_with("a,,c\n"));
        assert!(text.ends_with("\n,x\n"));
        assert_eq!(
            read_back(&text, b','),
            vec![vec!["a", "", "c"], vec![""], vec!["", "x"]]
        );
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_empty_text_is_ignored() {
        let mut table = SparseTable::new();
        table.set_cell(0, 0, "");
        assert!(table.is_empty());
        assert_eq!(table.to_delimited(b',').unwrap(), "");
    }

    #[test]
    fn test_overwrite_keeps_last_value() {
        let mut table = SparseTable::new();
        table.set_cell(1, 1, "old");
        table.set_cell(1, 1, "new");
        assert_eq!(table.get(1, 1), Some("new"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_fields_are_quoted_when_needed() {
        let mut table = SparseTable::new();
        table.set_cell(0, 0, "1,5");
        table.set_cell(1, 0, "say \"hi\"");
        assert_eq!(
            table.to_delimited(b',').unwrap(),
            "\"1,5\",\"say \"\"hi\"\"\"\n"
        );
        assert_eq!(
            table.to_delimited(b';').unwrap(),
            "1,5;\"say \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn test_carriage_return_is_quoted() {
        let mut table = SparseTable::new();
        table.set_cell(0, 0, "a\rb");
        table.set_cell(1, 0, " x");
        let text = table.to_delimited(b',').unwrap();
        assert!(text.contains("\"a\rb\""));
        assert_eq!(read_back(&text, b','), vec![vec!["a\rb", " x"]]);
    }

    #[test]
    fn test_special_fields_survive_reading_back() {
        let fields = ["line\nbreak", "semi;colon", "quote\"d", "cr\rlf\n", "plain"];
        let mut table = SparseTable::new();
        for (column, text) in fields.iter().enumerate() {
            table.set_cell(column, 1, text);
        }
        table.set_cell(3, 2, "tail");

        for delimiter in [b',', b';'] {
            let text = table.to_delimited(delimiter).unwrap();
            let rows = read_back(&text, delimiter);
            assert_eq!(rows.len(), 3);
            assert_eq!(rows[0], vec![""]);
            assert_eq!(rows[1], fields);
            assert_eq!(rows[2], vec!["", "", "", "tail"]);
        }
    }
}
