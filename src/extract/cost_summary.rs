//! Cost summary readers.
//!
//! Two report writers produce cost summaries. Hot budget exports carry an
//! "ESTIMATED COST SUMMARY" table, either as a sheet or as the second table on
//! the first PDF page. Film production exports are PDFs whose first page lists
//! one section per line with dollar amounts.

use super::is_blank_row;
use crate::decode::DocumentDecoder;
use crate::error::ExtractionError;
use crate::numeric::{cell_number, parse_accounting};
use crate::pdf_table::{segment_tables, PdfPage};
use crate::schema::{CostSummaryRow, FileFormat};
use crate::table::{cell_at, Cell, Grid};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

pub const HOT_BUDGET_MARKER: &str = "ESTIMATED COST SUMMARY";
pub const FILM_PRODUCTION_MARKER: &str = "Film Production Cost Summary";

/// Rows following the hot budget header that belong to the summary.
const HOT_BUDGET_WINDOW: usize = 23;
const DIRECT_COSTS_ROW: &str = "Direct Costs A - K";
/// The summary is the second table on the first page of a hot budget PDF.
const HOT_BUDGET_PDF_TABLE: usize = 1;
const HOT_BUDGET_PDF_COLUMNS: usize = 5;

static SECTION_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d ").expect("section code pattern is valid"));
static PDF_SECTION_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CS\d+\b ").expect("pdf section code pattern is valid"));
static SECTION_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]\s").expect("section letter pattern is valid"));
static FILM_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z]\s|Bid Actual|,|\)").expect("film noise pattern is valid")
});

pub fn extract_cost_summary(
    decoder: &dyn DocumentDecoder,
    format: FileFormat,
    bytes: &[u8],
) -> Result<Vec<CostSummaryRow>, ExtractionError> {
    match format {
        FileFormat::Xlsx | FileFormat::Xlsb => {
            let grid = decoder.first_sheet(format, bytes)?;
            let text = grid.to_text();
            if text.contains(HOT_BUDGET_MARKER) {
                hot_budget_sheet_rows(&grid)
            } else if text.contains(FILM_PRODUCTION_MARKER) {
                Err(ExtractionError::UnrecognizedLayout(format!(
                    "{} spreadsheet",
                    FILM_PRODUCTION_MARKER
                )))
            } else {
                Err(unrecognized())
            }
        }
        FileFormat::Pdf => {
            let page = decoder.pdf_pages(bytes)?.into_iter().next().unwrap_or_default();
            let text = page.text();
            if text.contains(HOT_BUDGET_MARKER) {
                hot_budget_pdf_rows(&page)
            } else if text.contains(FILM_PRODUCTION_MARKER) {
                Ok(film_production_rows(text))
            } else {
                Err(unrecognized())
            }
        }
    }
}

fn unrecognized() -> ExtractionError {
    ExtractionError::UnrecognizedLayout("no cost summary marker".to_string())
}

fn is_subtotal(text: &str) -> bool {
    let upper = text.to_uppercase();
    upper.contains("SUB TOTAL") || upper.contains("SUBTOTAL")
}

fn row_is_subtotal(row: &[Cell]) -> bool {
    row.iter()
        .filter_map(Cell::as_text)
        .any(|text| is_subtotal(&text))
}

/// Text after the leading section code, e.g. `"A 1 Pre-Production"` reads as
/// `"Pre-Production"`.
fn strip_section_code(text: &str) -> String {
    match SECTION_CODE.find(text) {
        Some(m) => text[m.end()..].trim().to_string(),
        None => text.trim().to_string(),
    }
}

fn amount(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Text(text) => parse_accounting(&text.replace('$', "")),
        other => cell_number(other),
    }
}

/// Hot budget sheet: the 23 rows below the anchor, without empty columns,
/// sparse rows and subtotals. Of the remaining columns the first is the
/// section, the second the account range, and the next three the amounts.
pub fn hot_budget_sheet_rows(grid: &Grid) -> Result<Vec<CostSummaryRow>, ExtractionError> {
    let start = grid.anchor_row(HOT_BUDGET_MARKER);
    let window: Vec<&Vec<Cell>> = grid
        .rows()
        .iter()
        .skip(start + 1)
        .take(HOT_BUDGET_WINDOW)
        .filter(|row| !row.iter().any(|cell| cell.matches(DIRECT_COSTS_ROW)))
        .filter(|row| !row_is_subtotal(row))
        .collect();

    let width = window.iter().map(|row| row.len()).max().unwrap_or(0);
    let kept: Vec<usize> = (0..width)
        .filter(|col| {
            window
                .iter()
                .any(|row| row.get(*col).is_some_and(|cell| !cell.is_empty()))
        })
        .collect();

    let rows: Vec<Vec<&Cell>> = window
        .iter()
        .map(|row| {
            kept.iter()
                .map(|col| cell_at(row, *col))
                .collect::<Vec<_>>()
        })
        .filter(|cells| cells.iter().filter(|cell| !cell.is_empty()).count() >= 3)
        .collect();

    if rows.is_empty() {
        return Ok(Vec::new());
    }
    if kept.len() < 5 {
        return Err(ExtractionError::ColumnCount {
            expected: 5,
            found: kept.len(),
        });
    }

    debug!(
        "Hot budget sheet: header at row {}, {} summary rows",
        start,
        rows.len()
    );

    Ok(rows
        .iter()
        .map(|cells| {
            let bid_total = amount(cells[2]).unwrap_or(0.0);
            let actual = amount(cells[3]).unwrap_or(0.0);
            CostSummaryRow {
                section: strip_section_code(&cells[0].as_text().unwrap_or_default()),
                bid_total,
                actual,
                variance: amount(cells[4]).unwrap_or(0.0),
            }
        })
        .collect())
}

/// Hot budget PDF: the second table of the first page, with its account range
/// column ignored and `CS<n>` codes removed from section names.
pub fn hot_budget_pdf_rows(page: &PdfPage) -> Result<Vec<CostSummaryRow>, ExtractionError> {
    let tables = segment_tables(page);
    let grid = tables.get(HOT_BUDGET_PDF_TABLE).ok_or_else(|| {
        ExtractionError::UnrecognizedLayout(format!(
            "{} tables on first page, summary expected at index {}",
            tables.len(),
            HOT_BUDGET_PDF_TABLE
        ))
    })?;

    let found = grid.row(0).len();
    if found != HOT_BUDGET_PDF_COLUMNS {
        return Err(ExtractionError::ColumnCount {
            expected: HOT_BUDGET_PDF_COLUMNS,
            found,
        });
    }

    let mut rows = Vec::new();
    for row in grid.rows().iter().skip(1) {
        if is_blank_row(row) || row_is_subtotal(row) {
            continue;
        }

        let values = [2, 3, 4].map(|col| amount(cell_at(row, col)));
        if values.iter().all(Option::is_none) {
            continue;
        }

        let section = cell_at(row, 0).as_text().unwrap_or_default();
        let [bid_total, actual, variance] = values.map(|value| value.unwrap_or(0.0));
        rows.push(CostSummaryRow {
            section: PDF_SECTION_CODE.replace_all(&section, "").trim().to_string(),
            bid_total,
            actual,
            variance,
        });
    }

    Ok(rows)
}

/// Film production PDF: one `section $bid $actual` line per section between
/// the first lettered section and the grand total.
pub fn film_production_rows(page: &str) -> Vec<CostSummaryRow> {
    let body = match page.find(FILM_PRODUCTION_MARKER) {
        Some(idx) => &page[idx + FILM_PRODUCTION_MARKER.len()..],
        None => page,
    };
    let body = body.replace('(', "-");

    let start = SECTION_LETTER.find(&body).map(|m| m.start()).unwrap_or(0);
    let end = body[start..]
        .find("\nGRAND TOTAL")
        .map(|idx| start + idx)
        .unwrap_or(body.len());
    let cleaned = FILM_NOISE.replace_all(&body[start..end], "");

    cleaned
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('$').collect();
            if parts.len() < 3 {
                return None;
            }

            let section = parts[0].trim();
            if is_subtotal(section) {
                return None;
            }

            let bid_total = parse_accounting(parts[1]).unwrap_or(0.0);
            let actual = parse_accounting(parts[2]).unwrap_or(0.0);
            Some(CostSummaryRow {
                section: section.to_string(),
                bid_total,
                actual,
                variance: actual - bid_total,
            })
        })
        .collect()
}
