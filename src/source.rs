//! ==============================================================================
//! source.rs - spreadsheet row source
//! ==============================================================================
//!
//! purpose:
//!     turns the first worksheet of a workbook into sensor readings.
//!     the header row names the columns; a `Time` / `timestamp` column is
//!     recognised case-insensitively and becomes `recorded_at`, every other
//!     named column is a channel.
//!
//! cell rules:
//!     - numbers (float, int, bool) are taken as-is
//!     - empty cells read as 0.0
//!     - text that parses as a number is accepted, any other text marks the
//!       row malformed; the uploader skips malformed rows
//!
//! ==============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDateTime;

use crate::domain::{SensorReading, TIME_FORMAT};
use crate::error::{RowError, SourceError};

pub type SourceRow = Result<SensorReading, RowError>;

/// header plus parsed rows, in sheet order
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    pub columns: Vec<String>,
    pub rows: Vec<SourceRow>,
}

impl SourceTable {
    /// build from raw cells; the first row is the header
    pub fn from_cells<'a, I>(mut cells: I) -> Result<Self, SourceError>
    where
        I: Iterator<Item = &'a [Data]>,
    {
        let header = cells.next().ok_or(SourceError::MissingHeader)?;
        let columns: Vec<String> = header.iter().map(|c| cell_text(c).trim().to_string()).collect();

        if columns.iter().all(|c| c.is_empty()) {
            return Err(SourceError::MissingHeader);
        }

        let time_col = columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case("time") || c.eq_ignore_ascii_case("timestamp"));

        // sheet rows are 1-based and the header is row 1
        let rows = cells
            .enumerate()
            .map(|(i, row)| parse_row(i + 2, &columns, time_col, row))
            .collect();

        Ok(Self { columns, rows })
    }

    /// `expected` names that have no column in the header
    pub fn missing_columns<'a>(&self, expected: &[&'a str]) -> Vec<&'a str> {
        expected
            .iter()
            .filter(|name| !self.columns.iter().any(|c| c == *name))
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn malformed(&self) -> usize {
        self.rows.iter().filter(|r| r.is_err()).count()
    }
}

/// read the first worksheet of an xlsx / xls / ods file
pub fn load_workbook(path: impl AsRef<Path>) -> Result<SourceTable, SourceError> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SourceError::NoWorksheet(path.to_path_buf()))?
        .map_err(|source| SourceError::Worksheet {
            path: path.to_path_buf(),
            source,
        })?;

    SourceTable::from_cells(range.rows())
}

fn parse_row(
    row_number: usize,
    columns: &[String],
    time_col: Option<usize>,
    cells: &[Data],
) -> SourceRow {
    if cells.iter().all(|c| matches!(c, Data::Empty)) {
        return Err(RowError::Empty { row: row_number });
    }

    let recorded_at = time_col.and_then(|i| cells.get(i)).and_then(cell_time);

    let mut values = BTreeMap::new();
    for (i, column) in columns.iter().enumerate() {
        if Some(i) == time_col || column.is_empty() {
            continue;
        }
        let cell = cells.get(i).unwrap_or(&Data::Empty);
        let value = cell_number(cell).ok_or_else(|| RowError::NotNumeric {
            row: row_number,
            column: column.clone(),
            value: cell_text(cell),
        })?;
        values.insert(column.clone(), value);
    }

    Ok(SensorReading {
        recorded_at,
        values,
    })
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Data::Empty => Some(0.0),
        Data::String(s) if s.trim().is_empty() => Some(0.0),
        Data::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn cell_time(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) => parse_time(s.trim()),
        Data::DateTime(dt) => dt.as_datetime(),
        _ => None,
    }
}

fn parse_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}
