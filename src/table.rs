//! In-memory tables as handed over by the spreadsheet reader.
//!
//! Rows keep their top-to-bottom layout order; nothing in this crate sorts
//! or mutates a [`TabularSource`] once it has been built.

use crate::error::{ReconciliationError, Result};
use crate::utils::{column_index, parse_amount, parse_ledger_date};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Read;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Builds a cell from raw text: blank text becomes [`Cell::Empty`].
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(text) => parse_amount(text),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(date) => Some(*date),
            Cell::Text(text) => parse_ledger_date(text),
            _ => None,
        }
    }

    /// Textual rendering of the cell; integral numbers print without a fraction
    /// so numeric account codes read back as `411000`, not `411000.0`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(text) => Some(text.clone()),
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                Some(format!("{}", *value as i64))
            }
            Cell::Number(value) => Some(value.to_string()),
            Cell::Date(date) => Some(date.format("%d/%m/%Y").to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Convenience constructor used by fixtures: every value is read as text.
    pub fn from_texts<S: AsRef<str>>(values: &[S]) -> Self {
        Self {
            cells: values.iter().map(|v| Cell::from_text(v.as_ref())).collect(),
        }
    }

    /// Cell at a zero-based column; columns past the end of the row read as empty.
    pub fn cell(&self, column: usize) -> &Cell {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    pub fn cell_at(&self, letter: &str) -> Result<&Cell> {
        Ok(self.cell(column_index(letter)?))
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TabularSource {
    pub name: String,
    rows: Vec<Row>,
}

impl TabularSource {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Reads a CSV export. No header handling is applied: header and caption
    /// lines stay in the table as ordinary rows, because GL and TB exports
    /// interleave them with data. The CSV parser drops completely empty lines,
    /// so block separators must be exported as delimiter-only lines (`,,,`).
    pub fn from_csv_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(Row::new(record.iter().map(Cell::from_text).collect()));
        }

        Ok(Self::new(name, rows))
    }

    pub fn from_csv_str(name: impl Into<String>, content: &str) -> Result<Self> {
        Self::from_csv_reader(name, content.as_bytes())
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Row::width).max().unwrap_or(0)
    }

    /// True when the table has no rows or only blank ones.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Row::is_blank)
    }

    pub(crate) fn require_content<'a>(
        table: Option<&'a TabularSource>,
        what: &str,
    ) -> Result<&'a TabularSource> {
        match table {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(ReconciliationError::MissingSourceTable(what.to_string())),
        }
    }
}
