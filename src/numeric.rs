//! Accounting-notation number parsing.
//!
//! Report cells arrive as `"1,234.50"`, `"(250)"` or already typed numbers.
//! Everything is coerced to `Option<f64>`; `None` is the missing value and a
//! failed coercion never becomes an error.

use crate::table::Cell;

/// Parses an accounting formatted amount.
///
/// Thousands separators and closing parentheses are removed and an opening
/// parenthesis becomes a minus sign, so `"(1,234)"` reads as `-1234.0`.
pub fn parse_accounting(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && *c != ')')
        .map(|c| if c == '(' { '-' } else { c })
        .collect();

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().and_then(finite)
}

/// Numeric value of a grid cell.
pub fn cell_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(value) => finite(*value),
        Cell::Text(text) => parse_accounting(text),
        Cell::Empty => None,
    }
}

/// Maps NaN and infinities to the missing value.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
