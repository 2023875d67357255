//! Table reconstruction from PDF page layout.
//!
//! A page is a list of lines, each holding text cells with their horizontal
//! extent. Cells are assigned to the header column whose span contains the
//! cell's horizontal center, so a value printed under a different column than
//! usual (a payee written where the line number should be) keeps its printed
//! position. Extents are in points for pages laid out from PDF glyphs and in
//! character columns for pages read from plain text.

use crate::table::{Cell, Grid};
use regex::Regex;
use std::sync::LazyLock;

/// Runs of non-space tokens joined by single spaces.
static CELL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+(?: \S+)*").expect("cell pattern is valid"));

const TAB_WIDTH: usize = 4;

/// Horizontal gap, in font sizes, that separates two cells on a line.
const CELL_GAP: f64 = 0.8;
/// Horizontal gap, in font sizes, read as a space inside a cell.
const WORD_GAP: f64 = 0.15;
/// Glyphs whose baselines differ by at most this many font sizes share a line.
const BASELINE_TOLERANCE: f64 = 0.5;
/// Baseline distance, in font sizes, above which a line starts a new block.
const BLOCK_GAP: f64 = 1.8;

/// A text run and its horizontal extent `[start, end)` on the line.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedCell {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl PositionedCell {
    fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// One glyph as drawn on the page. Coordinates are PDF user space, so `y`
/// grows towards the top of the page; `width` is the advance in points.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub size: f64,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfLine {
    pub cells: Vec<PositionedCell>,
    /// A blank line or a wide vertical gap precedes this line.
    pub block_start: bool,
}

impl PdfLine {
    fn has_cell(&self, text: &str) -> bool {
        self.cells.iter().any(|cell| cell.text == text)
    }
}

/// Positioned lines of one page, plus the page as text for content sniffing
/// and free-text parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfPage {
    text: String,
    lines: Vec<PdfLine>,
}

impl PdfPage {
    /// Reads space-padded text. Cells are runs separated by two or more
    /// spaces and blank lines separate blocks.
    pub fn from_text(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut after_blank = false;
        for line in text.lines() {
            if is_blank(line) {
                after_blank = true;
                continue;
            }
            lines.push(PdfLine {
                cells: split_cells(line),
                block_start: after_blank,
            });
            after_blank = false;
        }

        Self {
            text: text.to_string(),
            lines,
        }
    }

    /// Lays glyphs out into lines by baseline and into cells by horizontal
    /// gaps. Whitespace glyphs are dropped; spacing comes from positions.
    pub fn from_glyphs(glyphs: Vec<Glyph>) -> Self {
        let lines = layout_lines(glyphs);
        Self {
            text: render(&lines),
            lines,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[PdfLine] {
        &self.lines
    }
}

impl From<&str> for PdfPage {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

pub fn split_cells(line: &str) -> Vec<PositionedCell> {
    let expanded = line.replace('\t', &" ".repeat(TAB_WIDTH));

    CELL_PATTERN
        .find_iter(&expanded)
        .map(|m| {
            let start = expanded[..m.start()].chars().count();
            let text = m.as_str().to_string();
            let end = start + text.chars().count();
            PositionedCell {
                start: start as f64,
                end: end as f64,
                text,
            }
        })
        .collect()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn layout_lines(mut glyphs: Vec<Glyph>) -> Vec<PdfLine> {
    glyphs.retain(|glyph| !glyph.text.trim().is_empty() && glyph.size > 0.0);
    glyphs.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut rows: Vec<Vec<Glyph>> = Vec::new();
    for glyph in glyphs {
        match rows.last_mut() {
            Some(row)
                if row[0].y - glyph.y <= BASELINE_TOLERANCE * row[0].size.max(glyph.size) =>
            {
                row.push(glyph)
            }
            _ => rows.push(vec![glyph]),
        }
    }

    let mut lines = Vec::with_capacity(rows.len());
    let mut previous_baseline: Option<f64> = None;
    for row in rows {
        let baseline = row[0].y;
        let size = row.iter().map(|glyph| glyph.size).fold(0.0, f64::max);
        let block_start =
            previous_baseline.is_some_and(|previous| previous - baseline > BLOCK_GAP * size);
        previous_baseline = Some(baseline);

        lines.push(PdfLine {
            cells: row_cells(row),
            block_start,
        });
    }

    lines
}

fn row_cells(mut row: Vec<Glyph>) -> Vec<PositionedCell> {
    row.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut cells: Vec<PositionedCell> = Vec::new();
    for glyph in row {
        let end = glyph.x + glyph.width;
        match cells.last_mut() {
            Some(cell) if glyph.x - cell.end <= CELL_GAP * glyph.size => {
                if glyph.x - cell.end > WORD_GAP * glyph.size {
                    cell.text.push(' ');
                }
                cell.text.push_str(&glyph.text);
                cell.end = cell.end.max(end);
            }
            _ => cells.push(PositionedCell {
                start: glyph.x,
                end,
                text: glyph.text,
            }),
        }
    }

    cells
}

/// Cells joined by two spaces, lines by newlines, blocks by a blank line.
fn render(lines: &[PdfLine]) -> String {
    let mut text = String::new();
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            text.push('\n');
            if line.block_start {
                text.push('\n');
            }
        }
        let cells: Vec<&str> = line.cells.iter().map(|cell| cell.text.as_str()).collect();
        text.push_str(&cells.join("  "));
    }
    text
}

/// Builds a grid whose first row is the first line. Following lines are
/// aligned to its columns; text that lands in an occupied column is joined
/// with a space.
pub fn align_lines(lines: &[PdfLine]) -> Grid {
    let Some((header, body)) = lines.split_first() else {
        return Grid::default();
    };

    let header = &header.cells;
    let boundaries: Vec<f64> = header
        .windows(2)
        .map(|pair| (pair[0].end + pair[1].start) / 2.0)
        .collect();

    let mut rows = vec![header.iter().map(|cell| Cell::text(&cell.text)).collect()];

    for line in body {
        let mut row: Vec<Option<String>> = vec![None; header.len()];
        for cell in &line.cells {
            let column = boundaries
                .iter()
                .filter(|boundary| **boundary <= cell.center())
                .count();
            let slot = &mut row[column];
            if let Some(existing) = slot {
                existing.push(' ');
                existing.push_str(&cell.text);
            } else {
                *slot = Some(cell.text.clone());
            }
        }
        rows.push(
            row.into_iter()
                .map(|text| text.map(Cell::text).unwrap_or_default())
                .collect(),
        );
    }

    Grid::from_rows(rows)
}

/// Splits a page into blocks and aligns each block that looks tabular (a
/// multi-column header and at least one more line).
pub fn segment_tables(page: &PdfPage) -> Vec<Grid> {
    let mut tables = Vec::new();
    let mut start = 0;
    let lines = page.lines();

    for end in 1..=lines.len() {
        if end == lines.len() || lines[end].block_start {
            let block = &lines[start..end];
            if block.len() >= 2 && block[0].cells.len() >= 2 {
                tables.push(align_lines(block));
            }
            start = end;
        }
    }

    tables
}

/// The table whose header line holds a cell equal to `anchor`, running to
/// the end of the page. Without the anchor the first line is the header.
pub fn table_at_anchor(page: &PdfPage, anchor: &str) -> Grid {
    let lines = page.lines();
    let start = find_anchor_line(lines, anchor).unwrap_or(0);
    align_lines(&lines[start.min(lines.len())..])
}

pub fn find_anchor_line(lines: &[PdfLine], anchor: &str) -> Option<usize> {
    lines.iter().position(|line| line.has_cell(anchor))
}
