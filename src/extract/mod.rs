//! Canonical table extraction, one module per report type.
//!
//! Each extractor reads either the first sheet of a workbook or the laid out
//! pages of a PDF and returns its canonical rows. Structural problems surface as an
//! [`ExtractionError`]; [`Contribution`] is the explicit value the
//! consolidation step decides on.

pub mod cost_summary;
pub mod payroll;
pub mod purchase_order;

pub use cost_summary::extract_cost_summary;
pub use payroll::extract_payroll;
pub use purchase_order::extract_purchase_order;

use crate::error::ExtractionError;
use crate::pdf_table::{find_anchor_line, table_at_anchor, PdfPage};
use crate::table::{Cell, Grid, Table};
use log::debug;

/// Header token of the itemized payroll and purchase order tables.
pub const LINE_ANCHOR: &str = "LINE";

/// What one extracted file adds to its dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Contribution<R> {
    Rows(Vec<R>),
    /// The file parsed but held no acceptable rows.
    Empty,
    Failed(ExtractionError),
}

impl<R> Contribution<R> {
    pub fn from_result(result: Result<Vec<R>, ExtractionError>) -> Self {
        match result {
            Ok(rows) if rows.is_empty() => Contribution::Empty,
            Ok(rows) => Contribution::Rows(rows),
            Err(e) => Contribution::Failed(e),
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            Contribution::Rows(rows) => rows.len(),
            _ => 0,
        }
    }

    /// Rows to append; empty and failed contributions add nothing.
    pub fn into_rows(self) -> Vec<R> {
        match self {
            Contribution::Rows(rows) => rows,
            Contribution::Empty | Contribution::Failed(_) => Vec::new(),
        }
    }
}

pub(crate) fn require_column(table: &Table, name: &str) -> Result<usize, ExtractionError> {
    table
        .column_index(name)
        .ok_or_else(|| ExtractionError::MissingColumn(name.to_string()))
}

/// Splits `"55 J Smith"` into `("55", Some("J Smith"))` at the first
/// whitespace. A payee without a space, or a description that starts with a
/// number, splits wrongly; the split is a heuristic, not a guarantee.
pub(crate) fn split_merged(text: &str) -> (String, Option<String>) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((head, rest)) => {
            let rest = rest.trim();
            (head.to_string(), (!rest.is_empty()).then(|| rest.to_string()))
        }
        None => (text.to_string(), None),
    }
}

/// Line and payee of a row. When the line column is blank, the payee cell is
/// assumed to hold both, as report writers print them together when the row
/// has no purchase order number.
pub(crate) fn recover_line_and_payee(
    line: &Cell,
    payee: &Cell,
) -> (Option<String>, Option<String>) {
    match (line.as_text(), payee.as_text()) {
        (Some(line), payee) => (Some(line), payee),
        (None, Some(merged)) => {
            let (line, payee) = split_merged(&merged);
            (Some(line), payee)
        }
        (None, None) => (None, None),
    }
}

pub(crate) fn is_blank_row(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_empty)
}

/// Applies fixed column names to a PDF grid whose first row is the header.
pub(crate) fn named_pdf_table(
    grid: &Grid,
    columns: &[&str],
) -> Result<Table, ExtractionError> {
    let found = grid.row(0).len();
    if found != columns.len() {
        return Err(ExtractionError::ColumnCount {
            expected: columns.len(),
            found,
        });
    }

    let rows = grid.rows()[1..]
        .iter()
        .filter(|row| !is_blank_row(row))
        .cloned()
        .collect();

    Ok(Table::new(
        columns.iter().map(|c| c.to_string()).collect(),
        rows,
    ))
}

/// Concatenates the table of every page under fixed column names. The first
/// page must hold the table; later pages only count when they repeat the
/// header.
pub(crate) fn paged_pdf_table(
    pages: &[PdfPage],
    columns: &[&str],
) -> Result<Table, ExtractionError> {
    if pages.is_empty() {
        return Err(ExtractionError::AnchorNotFound(LINE_ANCHOR.to_string()));
    }

    let mut rows = Vec::new();
    for (idx, page) in pages.iter().enumerate() {
        if idx > 0 && find_anchor_line(page.lines(), LINE_ANCHOR).is_none() {
            debug!("PDF page {} has no table header, skipping", idx + 1);
            continue;
        }

        match named_pdf_table(&table_at_anchor(page, LINE_ANCHOR), columns) {
            Ok(table) => rows.extend(table.into_rows()),
            Err(e) if idx == 0 => return Err(e),
            Err(e) => debug!("PDF page {} skipped: {}", idx + 1, e),
        }
    }

    Ok(Table::new(
        columns.iter().map(|c| c.to_string()).collect(),
        rows,
    ))
}
