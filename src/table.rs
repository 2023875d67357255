//! Generic grids and header-located tables.
//!
//! Every reader produces a [`Grid`] of raw cells. Report documents carry a
//! variable number of banner rows above the real header, so the header is
//! found by searching for an anchor token instead of assuming row 0.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Text cell; blank strings become [`Cell::Empty`].
    pub fn text(raw: impl AsRef<str>) -> Cell {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Text rendering of the cell. Integral numbers render without a
    /// fractional part so line numbers read as `"55"`, not `"55.0"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(text) => Some(text.clone()),
            Cell::Number(value) => Some(format_number(*value)),
        }
    }

    /// Exact match against a trimmed text token.
    pub fn matches(&self, token: &str) -> bool {
        match self {
            Cell::Text(text) => text == token,
            _ => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(value) => f.write_str(&format_number(*value)),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// Cell `col` of a row, empty past the row's end.
pub fn cell_at(row: &[Cell], col: usize) -> &Cell {
    row.get(col).unwrap_or(&EMPTY_CELL)
}

/// Raw rows of one sheet or reconstructed PDF table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> &[Cell] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        cell_at(self.row(row), col)
    }

    /// First row holding a cell equal to `anchor`.
    pub fn find_anchor(&self, anchor: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.iter().any(|cell| cell.matches(anchor)))
    }

    /// Header row index; row 0 when the anchor is absent.
    pub fn anchor_row(&self, anchor: &str) -> usize {
        self.find_anchor(anchor).unwrap_or(0)
    }

    /// Plain text rendering used for content sniffing.
    pub fn to_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|cell| !cell.is_empty())
                    .map(Cell::to_string)
                    .collect::<Vec<_>>()
                    .join("  ")
            })
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn is_blank(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_empty)
}

/// A grid slice with named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Cell>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive lookup of a column; the first duplicate wins.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.trim().eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell of `row` under `column`, empty when either is missing.
    pub fn value<'a>(&self, row: &'a [Cell], column: Option<usize>) -> &'a Cell {
        column.and_then(|idx| row.get(idx)).unwrap_or(&EMPTY_CELL)
    }
}

/// How rows follow the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Header row, then data until the first fully blank row.
    Wide,
    /// Header row followed by exactly one data row.
    Summary,
}

/// Column name whose presence in the leading row selects [`Layout::Summary`].
pub const SUMMARY_MARKER: &str = "ACTUAL";

/// Decides the layout of a sheet whose header sits at `header_row`.
///
/// Sheets with banner rows above the header are summaries when the leading row
/// already names an `ACTUAL` column; the header row itself carries the
/// itemized table otherwise.
pub fn detect_layout(grid: &Grid, header_row: usize) -> Layout {
    let leading_has_actual = grid
        .row(0)
        .iter()
        .any(|cell| cell.matches(SUMMARY_MARKER));

    if header_row > 0 && leading_has_actual {
        Layout::Summary
    } else {
        Layout::Wide
    }
}

/// Locates the header by `anchor` and slices the data rows per the detected
/// layout. Blank header cells inherit the label of the row above, which
/// recovers two-row headers.
pub fn read_layout(grid: &Grid, anchor: &str) -> Table {
    let start = grid.anchor_row(anchor);
    let header = grid.row(start);
    let above = start.checked_sub(1).map(|idx| grid.row(idx)).unwrap_or(&[]);

    match detect_layout(grid, start) {
        Layout::Wide => {
            let columns = header
                .iter()
                .enumerate()
                .map(|(idx, cell)| match cell.as_text() {
                    Some(name) => name,
                    None => above
                        .get(idx)
                        .and_then(Cell::as_text)
                        .unwrap_or_default(),
                })
                .collect();

            let rows = grid.rows()[(start + 1).min(grid.len())..]
                .iter()
                .take_while(|row| !is_blank(row))
                .cloned()
                .collect();

            Table::new(columns, rows)
        }
        Layout::Summary => {
            let columns = header
                .iter()
                .map(|cell| cell.as_text().unwrap_or_default())
                .collect();
            let rows = grid.rows().get(start + 1).cloned().into_iter().collect();

            Table::new(columns, rows)
        }
    }
}
