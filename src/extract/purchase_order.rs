use super::{paged_pdf_table, recover_line_and_payee, require_column, split_merged, LINE_ANCHOR};
use crate::decode::DocumentDecoder;
use crate::error::ExtractionError;
use crate::numeric::{cell_number, parse_accounting};
use crate::schema::{FileFormat, PurchaseOrderRow};
use crate::table::{read_layout, Table};

/// Column layout of the purchase order log, in both the PDF and sheet exports.
pub const COLUMNS: [&str; 7] = ["LINE", "PAYEE", "PO", "DATE", "PAYID", "ACTUAL", "LINE DESCRIPTION"];

pub fn extract_purchase_order(
    decoder: &dyn DocumentDecoder,
    format: FileFormat,
    bytes: &[u8],
) -> Result<Vec<PurchaseOrderRow>, ExtractionError> {
    let table = match format {
        FileFormat::Xlsx | FileFormat::Xlsb => {
            let grid = decoder.first_sheet(format, bytes)?;
            read_layout(&grid, LINE_ANCHOR)
        }
        FileFormat::Pdf => paged_pdf_table(&decoder.pdf_pages(bytes)?, &COLUMNS)?,
    };

    purchase_order_rows(&table)
}

pub fn purchase_order_rows(table: &Table) -> Result<Vec<PurchaseOrderRow>, ExtractionError> {
    let line_col = require_column(table, "LINE")?;
    let payee_col = require_column(table, "PAYEE")?;
    let po_col = require_column(table, "PO")?;
    let date_col = require_column(table, "DATE")?;
    let pay_id_col = require_column(table, "PAYID")?;
    let actual_col = require_column(table, "ACTUAL")?;
    let description_col = require_column(table, "LINE DESCRIPTION")?;

    let mut rows = Vec::new();
    for row in table.rows() {
        let (line, payee) = recover_line_and_payee(
            table.value(row, Some(line_col)),
            table.value(row, Some(payee_col)),
        );
        let (Some(line), Some(payee)) = (line, payee) else {
            continue;
        };

        let actual_cell = table.value(row, Some(actual_col));
        let description_cell = table.value(row, Some(description_col));

        // An amount printed inside the description column is recovered from
        // the description's first token.
        let (actual, description) = match (actual_cell.is_empty(), description_cell.as_text()) {
            (true, Some(merged)) => {
                let (amount, rest) = split_merged(&merged);
                (parse_accounting(&amount), rest)
            }
            (_, description) => (cell_number(actual_cell), description),
        };

        rows.push(PurchaseOrderRow {
            line,
            payee,
            po: table.value(row, Some(po_col)).as_text(),
            date: table.value(row, Some(date_col)).as_text(),
            pay_id: table.value(row, Some(pay_id_col)).as_text(),
            actual,
            description,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_table::PdfPage;
    use crate::table::{Cell, Grid};

    fn t(text: &str) -> Cell {
        Cell::text(text)
    }

    fn header() -> Vec<Cell> {
        COLUMNS.iter().map(|c| t(c)).collect()
    }

    #[test]
    fn test_sheet_rows() {
        let grid = Grid::from_rows(vec![
            vec![t("PO LOG")],
            header(),
            vec![
                Cell::Number(210.0),
                t("Camera House"),
                Cell::Number(1001.0),
                t("2024-03-01"),
                t("CHK 88"),
                t("2,500.00"),
                t("Lens rental"),
            ],
            vec![
                Cell::Empty,
                t("115 Hotel Roma"),
                Cell::Empty,
                t("2024-03-02"),
                Cell::Empty,
                Cell::Empty,
                t("(120.50) Refund deposit"),
            ],
            vec![t("117"), Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty, t("10"), Cell::Empty],
        ]);

        let rows = purchase_order_rows(&read_layout(&grid, LINE_ANCHOR)).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].line, "210");
        assert_eq!(rows[0].po.as_deref(), Some("1001"));
        assert_eq!(rows[0].actual, Some(2500.0));
        assert_eq!(rows[0].description.as_deref(), Some("Lens rental"));

        assert_eq!(rows[1].line, "115");
        assert_eq!(rows[1].payee, "Hotel Roma");
        assert_eq!(rows[1].actual, Some(-120.5));
        assert_eq!(rows[1].description.as_deref(), Some("Refund deposit"));
    }

    #[test]
    fn test_missing_column_is_structure_failure() {
        let grid = Grid::from_rows(vec![vec![t("LINE"), t("PAYEE"), t("ACTUAL")]]);
        let err = purchase_order_rows(&read_layout(&grid, LINE_ANCHOR)).unwrap_err();
        assert_eq!(err, ExtractionError::MissingColumn("PO".to_string()));
    }

    #[test]
    fn test_pdf_rows() {
        let page = [
            "Purchase Order Log",
            "",
            "LINE   PAYEE            PO      DATE        PAYID    ACTUAL     LINE DESCRIPTION",
            "201    Grip Truck Co    5001    03/04/24    CC       1,200.00   Truck",
            "       118 Taxi Ltd             03/05/24    CASH                (45) Return fare",
        ]
        .join("\n");

        let table = paged_pdf_table(&[PdfPage::from_text(&page)], &COLUMNS).unwrap();
        let rows = purchase_order_rows(&table).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].payee, "Grip Truck Co");
        assert_eq!(rows[0].actual, Some(1200.0));
        assert_eq!(rows[1].line, "118");
        assert_eq!(rows[1].payee, "Taxi Ltd");
        assert_eq!(rows[1].po, None);
        assert_eq!(rows[1].actual, Some(-45.0));
        assert_eq!(rows[1].description.as_deref(), Some("Return fare"));
    }
}
