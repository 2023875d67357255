//! Best-file selection within a project.

use crate::schema::{FileFormat, FileRecord, ReportType};

/// Picks the file of `report_type` in the most preferred format.
///
/// Candidates are walked once per format in `preference` order; within a
/// format the first candidate in traversal order wins. Formats missing from
/// `preference` are never selected.
pub fn select_best_file<'a>(
    report_type: ReportType,
    candidates: &'a [FileRecord],
    preference: &[FileFormat],
) -> Option<&'a FileRecord> {
    preference.iter().find_map(|format| {
        candidates
            .iter()
            .find(|record| record.detected_type == report_type && record.format == *format)
    })
}
