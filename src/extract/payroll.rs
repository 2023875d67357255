use super::{paged_pdf_table, recover_line_and_payee, require_column, LINE_ANCHOR};
use crate::decode::DocumentDecoder;
use crate::departments::department_for_line;
use crate::error::ExtractionError;
use crate::numeric::{cell_number, finite};
use crate::pdf_table::PdfPage;
use crate::schema::{FileFormat, PayrollRow};
use crate::table::{read_layout, Table};

/// Column layout of the payroll report PDF export.
pub const PDF_COLUMNS: [&str; 19] = [
    "LINE",
    "PAYEE",
    "PO",
    "F1",
    "F2",
    "DAYS",
    "RATE",
    "BASE",
    "1.5",
    "2",
    "3",
    "TAXABLE",
    "NON-TAX",
    "TOTAL ST",
    "TOTAL OT",
    "ACTUAL",
    "FRINGE 1",
    "FRINGE 2",
    "LINE DESCRIPTION",
];

pub fn extract_payroll(
    decoder: &dyn DocumentDecoder,
    format: FileFormat,
    bytes: &[u8],
) -> Result<Vec<PayrollRow>, ExtractionError> {
    let table = match format {
        FileFormat::Xlsx | FileFormat::Xlsb => {
            let grid = decoder.first_sheet(format, bytes)?;
            read_layout(&grid, LINE_ANCHOR)
        }
        FileFormat::Pdf => pdf_table(&decoder.pdf_pages(bytes)?)?,
    };

    payroll_rows(&table)
}

pub(crate) fn pdf_table(pages: &[PdfPage]) -> Result<Table, ExtractionError> {
    paged_pdf_table(pages, &PDF_COLUMNS)
}

/// Canonical payroll rows with derived estimate, variance and department.
pub fn payroll_rows(table: &Table) -> Result<Vec<PayrollRow>, ExtractionError> {
    let line_col = require_column(table, "LINE")?;
    let payee_col = require_column(table, "PAYEE")?;
    let rate_col = require_column(table, "RATE")?;
    let days_col = require_column(table, "DAYS")?;
    let actual_col = require_column(table, "ACTUAL")?;
    let description_col = table
        .column_index("LINE DESCRIPTION")
        .or_else(|| table.column_index("DESCRIPTION"));

    let mut rows = Vec::new();
    for row in table.rows() {
        let (line, payee) = recover_line_and_payee(
            table.value(row, Some(line_col)),
            table.value(row, Some(payee_col)),
        );
        let (Some(line), Some(payee)) = (line, payee) else {
            continue;
        };

        let rate = cell_number(table.value(row, Some(rate_col)));
        let days = cell_number(table.value(row, Some(days_col)));
        let actual = cell_number(table.value(row, Some(actual_col)));

        let estimate = rate.zip(days).and_then(|(rate, days)| finite(rate * days));
        let variance = actual
            .zip(estimate)
            .and_then(|(actual, estimate)| finite(actual - estimate));
        let variance_pct = variance
            .zip(estimate)
            .filter(|(_, estimate)| *estimate != 0.0)
            .and_then(|(variance, estimate)| finite(variance / estimate * 100.0));

        rows.push(PayrollRow {
            section: department_for_line(&line).to_string(),
            line,
            payee,
            rate,
            estimate,
            actual,
            variance,
            variance_pct,
            description: table.value(row, description_col).as_text(),
        });
    }

    Ok(rows)
}
