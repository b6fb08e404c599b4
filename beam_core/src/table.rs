//! # Tabular Input
//!
//! A small column-oriented table model plus readers for the two supported
//! input encodings: comma-separated text and spreadsheet workbooks (first
//! sheet, first row as headers).
//!
//! Cells are typed at read time. Non-numeric cells surface as [`Cell::Text`]
//! and coerce to NaN when a numeric column is extracted; the NaN flows
//! through the downstream arithmetic and is only excluded when diagrams are
//! rendered.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};

use crate::errors::{BeamError, BeamResult};

/// A single table cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Cell {
    /// Numeric value
    Number(f64),
    /// Text that did not parse as a number
    Text(String),
    /// Blank cell
    Empty,
}

impl Cell {
    /// Parse a raw string field into a cell
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(value) => Cell::Number(value),
            Err(_) => Cell::Text(raw.to_string()),
        }
    }

    /// Numeric view of the cell. Text is re-parsed; anything that is not a
    /// number becomes NaN.
    pub fn as_f64(&self) -> f64 {
        match self {
            Cell::Number(value) => *value,
            Cell::Text(text) => text.trim().parse().unwrap_or(f64::NAN),
            Cell::Empty => f64::NAN,
        }
    }
}

/// An in-memory table: one header row plus data rows.
///
/// Rows may be ragged (shorter than the header row); missing cells read as
/// [`Cell::Empty`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl DataTable {
    /// Create a table from headers and rows
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        DataTable { headers, rows }
    }

    /// Header names, in input order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows, in input order
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no data rows
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    /// Index of the first header exactly equal to `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Replace the header at `index`
    pub fn rename_header(&mut self, index: usize, name: impl Into<String>) {
        if let Some(header) = self.headers.get_mut(index) {
            *header = name.into();
        }
    }

    /// Trim surrounding whitespace from every header name
    pub fn trim_headers(&mut self) {
        for header in &mut self.headers {
            let trimmed = header.trim();
            if trimmed.len() != header.len() {
                *header = trimmed.to_string();
            }
        }
    }

    /// Cell at (row, column); ragged rows read as empty
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        const EMPTY: &Cell = &Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(EMPTY)
    }

    /// Extract a column as f64 values (NaN for non-numeric cells).
    ///
    /// Returns `None` when no header matches `name` exactly.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map(Cell::as_f64).unwrap_or(f64::NAN))
                .collect(),
        )
    }
}

/// Load a tabular file, dispatching on extension: `.csv` is read as
/// comma-separated text, anything else is attempted as a spreadsheet.
///
/// A file that parses but contains no data rows is rejected the same way an
/// unparseable one is: there is nothing to analyze.
pub fn load_table(path: &Path) -> BeamResult<DataTable> {
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let table = if is_csv {
        read_csv(path)?
    } else {
        read_spreadsheet(path)?
    };

    if table.is_empty() {
        return Err(BeamError::unreadable_input(
            path.display().to_string(),
            "file is empty or unreadable",
        ));
    }

    log::debug!(
        "loaded table from {}: {} columns, {} rows",
        path.display(),
        table.headers().len(),
        table.row_count()
    );

    Ok(table)
}

fn read_csv(path: &Path) -> BeamResult<DataTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| BeamError::unreadable_input(path.display().to_string(), e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| BeamError::unreadable_input(path.display().to_string(), e.to_string()))?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| BeamError::unreadable_input(path.display().to_string(), e.to_string()))?;
        rows.push(record.iter().map(Cell::parse).collect());
    }

    Ok(DataTable::new(headers, rows))
}

fn read_spreadsheet(path: &Path) -> BeamResult<DataTable> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| BeamError::unreadable_input(path.display().to_string(), e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            BeamError::unreadable_input(path.display().to_string(), "workbook has no sheets")
        })?
        .map_err(|e| BeamError::unreadable_input(path.display().to_string(), e.to_string()))?;

    let mut row_iter = range.rows();
    let headers = match row_iter.next() {
        Some(header_row) => header_row.iter().map(|d| d.to_string()).collect(),
        None => Vec::new(),
    };

    let rows = row_iter
        .map(|row| row.iter().map(cell_from_sheet).collect())
        .collect();

    Ok(DataTable::new(headers, rows))
}

fn cell_from_sheet(data: &Data) -> Cell {
    match data {
        Data::Float(value) => Cell::Number(*value),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::String(text) => Cell::parse(text),
        Data::Empty => Cell::Empty,
        other => Cell::parse(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;
    use std::fs;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = temp_dir().join(format!("beamsmith_test_{}", name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse("3.5"), Cell::Number(3.5));
        assert_eq!(Cell::parse("  42 "), Cell::Number(42.0));
        assert_eq!(Cell::parse("steel"), Cell::Text("steel".to_string()));
        assert_eq!(Cell::parse("   "), Cell::Empty);
    }

    #[test]
    fn test_cell_numeric_coercion() {
        assert_eq!(Cell::Number(2.0).as_f64(), 2.0);
        assert!(Cell::Text("abc".to_string()).as_f64().is_nan());
        assert!(Cell::Empty.as_f64().is_nan());
        // Numeric text still coerces
        assert_eq!(Cell::Text("7.5".to_string()).as_f64(), 7.5);
    }

    #[test]
    fn test_read_csv() {
        let path = write_temp("basic.csv", "Position (m),Load (kN)\n3.0,10.0\n6.5,hello\n");
        let table = load_table(&path).unwrap();

        assert_eq!(table.headers(), &["Position (m)", "Load (kN)"]);
        assert_eq!(table.row_count(), 2);

        let positions = table.numeric_column("Position (m)").unwrap();
        assert_eq!(positions, vec![3.0, 6.5]);

        let loads = table.numeric_column("Load (kN)").unwrap();
        assert_eq!(loads[0], 10.0);
        assert!(loads[1].is_nan());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_ragged_rows_read_as_empty() {
        let path = write_temp("ragged.csv", "a,b,c\n1.0\n2.0,3.0,4.0\n");
        let table = load_table(&path).unwrap();

        assert_eq!(table.cell(0, 2), &Cell::Empty);
        let column = table.numeric_column("c").unwrap();
        assert!(column[0].is_nan());
        assert_eq!(column[1], 4.0);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_empty_csv_rejected() {
        let path = write_temp("empty.csv", "Position (m),Load (kN)\n");
        let err = load_table(&path).unwrap_err();
        assert_eq!(err.error_code(), "UNREADABLE_INPUT");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_garbage_spreadsheet_rejected() {
        let path = write_temp("garbage.xlsx", "this is not a workbook");
        let err = load_table(&path).unwrap_err();
        assert_eq!(err.error_code(), "UNREADABLE_INPUT");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_column_index_is_exact() {
        let table = DataTable::new(
            vec!["x".to_string(), "X (m)".to_string()],
            vec![vec![Cell::Number(1.0), Cell::Number(2.0)]],
        );
        assert_eq!(table.column_index("x"), Some(0));
        assert_eq!(table.column_index("X"), None);
    }
}
