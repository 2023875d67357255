//! Line number to department mapping.
//!
//! Budget line numbers follow the industry-standard cost summary layout where
//! each department owns a contiguous block of lines.

pub const OTHER_DEPARTMENT: &str = "OTHER";

/// Half-open `[lower, upper)` line ranges and their department labels.
pub const DEPARTMENT_RANGES: &[(i64, i64, &str)] = &[
    (0, 51, "PRE-PRODUCTION | WRAP LABOR"),
    (51, 101, "SHOOTING LABOR"),
    (101, 114, "PRE-PRODUCTION | WRAP EXPENSES"),
    (114, 140, "LOCATION AND TRAVEL"),
    (140, 151, "MAKEUP, WARDROBE, AND ANIMALS"),
    (151, 168, "STUDIO | STAGE RENTAL / EXPENSES"),
    (168, 181, "ART DEPARTMENT LABOR"),
    (181, 193, "ART DEPARTMENT EXPENSES"),
    (193, 211, "EQUIPMENT COSTS"),
    (211, 217, "FILMSTOCK, DEVELOP AND PRINT"),
    (217, 227, "MISCELLANEOUS"),
    (227, 234, "DIRECTOR | CREATIVE FEES"),
    (234, 271, "TALENT LABOR"),
    (271, 277, "TALENT EXPENSES"),
    (277, 282, "POST PRODUCTION LABOR"),
    (282, 330, "EDITORIAL | FINISHING | POST PRODUCTION"),
];

/// Department label for a line identifier.
///
/// Identifiers that are not integers are returned unchanged; integers outside
/// every range map to [`OTHER_DEPARTMENT`].
pub fn department_for_line(line: &str) -> &str {
    match line.trim().parse::<i64>() {
        Ok(number) => department_for_number(number),
        Err(_) => line,
    }
}

pub fn department_for_number(number: i64) -> &'static str {
    DEPARTMENT_RANGES
        .iter()
        .find(|(lower, upper, _)| (*lower..*upper).contains(&number))
        .map(|(_, _, label)| *label)
        .unwrap_or(OTHER_DEPARTMENT)
}
