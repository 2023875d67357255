//! Container format readers.
//!
//! Spreadsheets are read with calamine. PDFs are interpreted by pdf-extract,
//! whose glyph positions are collected and laid out into lines and cells.
//! Both sit behind [`DocumentDecoder`] so the pipeline can run against any
//! reader that turns bytes into grids and pages.

use crate::error::DecodeError;
use crate::pdf_table::{Glyph, PdfPage};
use crate::schema::FileFormat;
use crate::table::{Cell, Grid};
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsb, Xlsx};
use chrono::NaiveDateTime;
use log::debug;
use pdf_extract::{Document, MediaBox, OutputDev, OutputError, Transform};
use std::io::Cursor;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub trait DocumentDecoder: Send + Sync {
    /// Cells of the first sheet of a workbook.
    fn first_sheet(&self, format: FileFormat, bytes: &[u8]) -> Result<Grid, DecodeError>;

    /// Every page of a PDF, in page order.
    fn pdf_pages(&self, bytes: &[u8]) -> Result<Vec<PdfPage>, DecodeError>;
}

/// Text used for content sniffing: the first page of a PDF or the first sheet
/// of a workbook.
pub fn snippet(
    decoder: &dyn DocumentDecoder,
    format: FileFormat,
    bytes: &[u8],
) -> Result<String, DecodeError> {
    match format {
        FileFormat::Pdf => Ok(first_page(decoder, bytes)?.text().to_string()),
        FileFormat::Xlsx | FileFormat::Xlsb => Ok(decoder.first_sheet(format, bytes)?.to_text()),
    }
}

pub fn first_page(decoder: &dyn DocumentDecoder, bytes: &[u8]) -> Result<PdfPage, DecodeError> {
    decoder
        .pdf_pages(bytes)?
        .into_iter()
        .next()
        .ok_or(DecodeError::NoPages)
}

/// calamine and pdf-extract backed decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDecoder;

impl DocumentDecoder for NativeDecoder {
    fn first_sheet(&self, format: FileFormat, bytes: &[u8]) -> Result<Grid, DecodeError> {
        let cursor = Cursor::new(bytes);
        let range = match format {
            FileFormat::Xlsx => {
                let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
                    .map_err(|e: calamine::XlsxError| DecodeError::Workbook(e.to_string()))?;
                first_range(&mut workbook)?
            }
            FileFormat::Xlsb => {
                let mut workbook: Xlsb<_> = open_workbook_from_rs(cursor)
                    .map_err(|e: calamine::XlsbError| DecodeError::Workbook(e.to_string()))?;
                first_range(&mut workbook)?
            }
            FileFormat::Pdf => {
                return Err(DecodeError::UnsupportedFormat(
                    "spreadsheet read of a PDF".to_string(),
                ))
            }
        };

        debug!(
            "Read {:?} sheet with {} rows x {} columns",
            format,
            range.height(),
            range.width()
        );

        Ok(Grid::from_rows(
            range
                .rows()
                .map(|row| row.iter().map(cell_from_data).collect())
                .collect(),
        ))
    }

    fn pdf_pages(&self, bytes: &[u8]) -> Result<Vec<PdfPage>, DecodeError> {
        // pdf-extract panics on some malformed fonts.
        let pages = match catch_unwind(AssertUnwindSafe(|| layout_pages(bytes))) {
            Ok(pages) => pages?,
            Err(_) => return Err(DecodeError::Pdf("text extraction panicked".to_string())),
        };

        if pages.is_empty() {
            return Err(DecodeError::NoPages);
        }

        debug!("Laid out {} PDF pages", pages.len());
        Ok(pages)
    }
}

/// Reads pages in order until one fails to interpret. A failure on the first
/// page fails the document.
fn layout_pages(bytes: &[u8]) -> Result<Vec<PdfPage>, DecodeError> {
    let mut document = Document::load_mem(bytes).map_err(|e| DecodeError::Pdf(e.to_string()))?;
    if document.is_encrypted() {
        document
            .decrypt("")
            .map_err(|e| DecodeError::Pdf(e.to_string()))?;
    }

    let mut output = GlyphCollector::default();
    for page_num in document.get_pages().into_keys() {
        if let Err(e) = pdf_extract::output_doc_page(&document, &mut output, page_num) {
            if output.pages.is_empty() {
                return Err(DecodeError::Pdf(e.to_string()));
            }
            debug!("Stopped reading PDF at page {}: {}", page_num, e);
            break;
        }
    }

    Ok(output.pages)
}

/// Records where every glyph lands on the page.
#[derive(Default)]
struct GlyphCollector {
    glyphs: Vec<Glyph>,
    pages: Vec<PdfPage>,
}

impl OutputDev for GlyphCollector {
    fn begin_page(
        &mut self,
        _page_num: u32,
        _media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.glyphs.clear();
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        let glyphs = std::mem::take(&mut self.glyphs);
        self.pages.push(PdfPage::from_glyphs(glyphs));
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        text: &str,
    ) -> Result<(), OutputError> {
        // `trm` maps text space to user space; its scale applies to both the
        // font size and the glyph advance.
        let scale = (trm.m11 * trm.m22 - trm.m12 * trm.m21).abs().sqrt();
        let size = font_size * scale;
        self.glyphs.push(Glyph {
            x: trm.m31,
            y: trm.m32,
            width: width * size,
            size,
            text: text.to_string(),
        });
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

fn first_range<RS, R>(workbook: &mut R) -> Result<Range<Data>, DecodeError>
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
{
    workbook
        .worksheet_range_at(0)
        .ok_or(DecodeError::NoSheets)?
        .map_err(|e| DecodeError::Workbook(format!("{:?}", e)))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::String(text) => Cell::text(text),
        Data::Bool(flag) => Cell::Text(flag.to_string()),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) => Cell::Text(format_date(datetime)),
            None => Cell::Number(value.as_f64()),
        },
        Data::DateTimeIso(text) | Data::DurationIso(text) => Cell::text(text),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

fn format_date(datetime: NaiveDateTime) -> String {
    datetime.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_data() {
        assert_eq!(cell_from_data(&Data::Int(55)), Cell::Number(55.0));
        assert_eq!(cell_from_data(&Data::Float(1.5)), Cell::Number(1.5));
        assert_eq!(
            cell_from_data(&Data::String("  J Smith ".to_string())),
            Cell::Text("J Smith".to_string())
        );
        assert_eq!(cell_from_data(&Data::String("   ".to_string())), Cell::Empty);
        assert_eq!(cell_from_data(&Data::Empty), Cell::Empty);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let decoder = NativeDecoder;
        let bytes = b"definitely not a workbook";
        assert!(decoder.first_sheet(FileFormat::Xlsx, bytes).is_err());
        assert!(decoder.first_sheet(FileFormat::Xlsb, bytes).is_err());
        assert!(decoder.first_sheet(FileFormat::Pdf, bytes).is_err());
        assert!(decoder.pdf_pages(bytes).is_err());
    }

    #[test]
    fn test_snippet_propagates_failure() {
        let decoder = NativeDecoder;
        assert!(snippet(&decoder, FileFormat::Pdf, b"%PDF-garbage").is_err());
    }

    mod native {
        use super::*;
        use crate::extract::{extract_cost_summary, extract_payroll, extract_purchase_order};
        use crate::extract::payroll::PDF_COLUMNS;
        use crate::extract::purchase_order::COLUMNS;
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};
        use rust_xlsxwriter::Workbook;

        /// Text drawn with its baseline starting at `(x, y)`, in points.
        type Placed = (i64, i64, String);

        fn at(x: i64, y: i64, text: &str) -> Placed {
            (x, y, text.to_string())
        }

        /// A PDF drawing every text in Helvetica at `font_size`, one page per
        /// entry of `pages`.
        fn build_pdf(page_width: i64, font_size: i64, pages: &[Vec<Placed>]) -> Vec<u8> {
            let mut doc = lopdf::Document::with_version("1.5");
            let pages_id = doc.new_object_id();
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            });
            let resources_id = doc.add_object(dictionary! {
                "Font" => dictionary! {
                    "F1" => font_id,
                },
            });

            let mut kids: Vec<Object> = Vec::new();
            for texts in pages {
                let mut operations = vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), font_size.into()]),
                ];
                for (x, y, text) in texts {
                    operations.push(Operation::new(
                        "Tm",
                        vec![1.into(), 0.into(), 0.into(), 1.into(), (*x).into(), (*y).into()],
                    ));
                    operations.push(Operation::new(
                        "Tj",
                        vec![Object::string_literal(text.as_str())],
                    ));
                }
                operations.push(Operation::new("ET", vec![]));

                let content = Content { operations }.encode().unwrap();
                let content_id = doc.add_object(Stream::new(dictionary! {}, content));
                let page_id = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content_id,
                    "Resources" => resources_id,
                    "MediaBox" => vec![0.into(), 0.into(), page_width.into(), 842.into()],
                });
                kids.push(page_id.into());
            }

            let count = kids.len() as i64;
            doc.objects.insert(
                pages_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Pages",
                    "Kids" => kids,
                    "Count" => count,
                }),
            );
            let catalog_id = doc.add_object(dictionary! {
                "Type" => "Catalog",
                "Pages" => pages_id,
            });
            doc.trailer.set("Root", catalog_id);

            let mut bytes = Vec::new();
            doc.save_to(&mut bytes).unwrap();
            bytes
        }

        const PO_X: [i64; 7] = [40, 80, 180, 230, 290, 340, 410];

        fn po_row(y: i64, cells: [&str; 7]) -> Vec<Placed> {
            PO_X.iter()
                .zip(cells)
                .filter(|(_, text)| !text.is_empty())
                .map(|(x, text)| at(*x, y, text))
                .collect()
        }

        fn po_log_pdf() -> Vec<u8> {
            let mut first = vec![at(40, 760, "Purchase Order Log")];
            first.extend(po_row(720, COLUMNS));
            first.extend(po_row(
                708,
                ["201", "Grip Truck Co", "5001", "03/04/24", "CC", "1,200.00", "Truck"],
            ));
            first.extend(po_row(
                696,
                ["", "118 Taxi Ltd", "", "03/05/24", "CASH", "", "(45) Return fare"],
            ));

            let mut second = po_row(720, COLUMNS);
            second.extend(po_row(
                708,
                ["202", "Dolly Co", "5002", "03/06/24", "CC", "300.00", "Dolly"],
            ));

            let footer = vec![at(40, 400, "Page 3 of 3")];

            build_pdf(612, 8, &[first, second, footer])
        }

        #[test]
        fn test_pdf_pages_keep_cell_positions() {
            let pages = NativeDecoder.pdf_pages(&po_log_pdf()).unwrap();
            assert_eq!(pages.len(), 3);

            let header: Vec<&str> = pages[0].lines()[1]
                .cells
                .iter()
                .map(|cell| cell.text.as_str())
                .collect();
            assert_eq!(header, COLUMNS.to_vec());
            assert!(pages[0].lines()[1].block_start);
            assert!(pages[0].text().starts_with("Purchase Order Log\n\nLINE  PAYEE  PO"));
        }

        #[test]
        fn test_purchase_order_pdf() {
            let rows =
                extract_purchase_order(&NativeDecoder, FileFormat::Pdf, &po_log_pdf()).unwrap();
            assert_eq!(rows.len(), 3);

            assert_eq!(rows[0].line, "201");
            assert_eq!(rows[0].payee, "Grip Truck Co");
            assert_eq!(rows[0].po.as_deref(), Some("5001"));
            assert_eq!(rows[0].actual, Some(1200.0));
            assert_eq!(rows[0].description.as_deref(), Some("Truck"));

            assert_eq!(rows[1].line, "118");
            assert_eq!(rows[1].payee, "Taxi Ltd");
            assert_eq!(rows[1].po, None);
            assert_eq!(rows[1].pay_id.as_deref(), Some("CASH"));
            assert_eq!(rows[1].actual, Some(-45.0));
            assert_eq!(rows[1].description.as_deref(), Some("Return fare"));

            assert_eq!(rows[2].payee, "Dolly Co");
        }

        #[test]
        fn test_pdf_snippet_is_page_text() {
            let text = snippet(&NativeDecoder, FileFormat::Pdf, &po_log_pdf()).unwrap();
            assert!(text.contains("Purchase Order Log"));
            assert!(text.contains("Grip Truck Co"));
        }

        fn payroll_row(y: i64, cells: &[(usize, &str)]) -> Vec<Placed> {
            cells
                .iter()
                .map(|(col, text)| at(30 + *col as i64 * 70, y, text))
                .collect()
        }

        #[test]
        fn test_payroll_pdf() {
            let header: Vec<(usize, &str)> = PDF_COLUMNS.iter().copied().enumerate().collect();
            let mut page = vec![at(30, 800, "PAYROLL REGISTER")];
            page.extend(payroll_row(760, &header));
            page.extend(payroll_row(
                748,
                &[(0, "55"), (1, "J Smith"), (5, "2"), (6, "500"), (15, "1,000.00"), (18, "Gaffer")],
            ));
            page.extend(payroll_row(
                736,
                &[(1, "120 M Ortiz"), (5, "1"), (6, "300"), (15, "(300.00)"), (18, "Driver")],
            ));
            let bytes = build_pdf(1400, 7, &[page]);

            let rows = extract_payroll(&NativeDecoder, FileFormat::Pdf, &bytes).unwrap();
            assert_eq!(rows.len(), 2);

            assert_eq!(rows[0].line, "55");
            assert_eq!(rows[0].payee, "J Smith");
            assert_eq!(rows[0].section, "SHOOTING LABOR");
            assert_eq!(rows[0].estimate, Some(1000.0));
            assert_eq!(rows[0].variance_pct, Some(0.0));
            assert_eq!(rows[0].description.as_deref(), Some("Gaffer"));

            assert_eq!(rows[1].line, "120");
            assert_eq!(rows[1].payee, "M Ortiz");
            assert_eq!(rows[1].section, "LOCATION AND TRAVEL");
            assert_eq!(rows[1].actual, Some(-300.0));
            assert_eq!(rows[1].variance, Some(-600.0));
        }

        #[test]
        fn test_hot_budget_pdf() {
            let page = vec![
                at(40, 780, "ACME PRODUCTIONS"),
                at(40, 768, "Hot Budget"),
                at(40, 730, "ESTIMATED COST SUMMARY"),
                at(300, 730, "Job 42"),
                at(40, 718, "Producer: J Doe"),
                at(300, 718, "Date 2024"),
                at(40, 680, "SECTION"),
                at(200, 680, "LINES"),
                at(280, 680, "BID TOTAL"),
                at(360, 680, "ACTUAL"),
                at(440, 680, "VARIANCE"),
                at(40, 668, "CS1 Pre-Production"),
                at(200, 668, "1-50"),
                at(280, 668, "1,000.00"),
                at(360, 668, "900.00"),
                at(440, 668, "100.00"),
                at(40, 656, "CS2 Shooting Crew"),
                at(200, 656, "51-100"),
                at(280, 656, "5,000.00"),
                at(360, 656, "5,200.00"),
                at(440, 656, "(200.00)"),
                at(40, 644, "SUB TOTAL A-B"),
                at(280, 644, "6,000.00"),
                at(360, 644, "6,100.00"),
                at(440, 644, "(100.00)"),
                at(40, 600, "Notes"),
            ];
            let bytes = build_pdf(612, 9, &[page]);

            let rows = extract_cost_summary(&NativeDecoder, FileFormat::Pdf, &bytes).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].section, "Pre-Production");
            assert_eq!(rows[0].bid_total, 1000.0);
            assert_eq!(rows[0].actual, 900.0);
            assert_eq!(rows[0].variance, 100.0);
            assert_eq!(rows[1].section, "Shooting Crew");
            assert_eq!(rows[1].variance, -200.0);
        }

        #[test]
        fn test_film_production_pdf() {
            let page = vec![
                at(40, 780, "ACME Productions"),
                at(40, 768, "Film Production Cost Summary"),
                at(40, 756, "Job 42"),
                at(250, 744, "Bid"),
                at(350, 744, "Actual"),
                at(40, 732, "A Pre-Production"),
                at(250, 732, "$1,000.00"),
                at(350, 732, "$900.00"),
                at(40, 720, "B Shooting Crew Labor"),
                at(250, 720, "$5,000.00"),
                at(350, 720, "$5,200.00"),
                at(40, 708, "GRAND TOTAL"),
                at(250, 708, "$6,000.00"),
                at(350, 708, "$6,100.00"),
            ];
            let bytes = build_pdf(612, 9, &[page]);

            let rows = extract_cost_summary(&NativeDecoder, FileFormat::Pdf, &bytes).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].section, "Pre-Production");
            assert_eq!(rows[0].variance, -100.0);
            assert_eq!(rows[1].section, "Shooting Crew Labor");
            assert_eq!(rows[1].actual, 5200.0);
        }

        #[test]
        fn test_payroll_workbook() {
            let mut workbook = Workbook::new();
            let sheet = workbook.add_worksheet();
            sheet.write_string(0, 0, "ACME PRODUCTIONS").unwrap();
            sheet.write_string(1, 0, "Payroll Report").unwrap();
            sheet.write_string(2, 0, "Week ending 06/01").unwrap();
            for (col, name) in ["LINE", "PAYEE", "DAYS", "RATE", "ACTUAL", "LINE DESCRIPTION"]
                .iter()
                .enumerate()
            {
                sheet.write_string(3, col as u16, *name).unwrap();
            }
            sheet.write_number(4, 0, 55).unwrap();
            sheet.write_string(4, 1, "J Smith").unwrap();
            sheet.write_number(4, 2, 2).unwrap();
            sheet.write_number(4, 3, 500).unwrap();
            sheet.write_number(4, 4, 1000).unwrap();
            sheet.write_string(4, 5, "Gaffer").unwrap();
            sheet.write_string(5, 1, "12 K Lee").unwrap();
            sheet.write_number(5, 2, 3).unwrap();
            sheet.write_string(5, 3, "400").unwrap();
            sheet.write_string(5, 4, "(1,500)").unwrap();
            let bytes = workbook.save_to_buffer().unwrap();

            let rows = extract_payroll(&NativeDecoder, FileFormat::Xlsx, &bytes).unwrap();
            assert_eq!(rows.len(), 2);

            assert_eq!(rows[0].line, "55");
            assert_eq!(rows[0].section, "SHOOTING LABOR");
            assert_eq!(rows[0].estimate, Some(1000.0));
            assert_eq!(rows[0].variance, Some(0.0));
            assert_eq!(rows[0].variance_pct, Some(0.0));

            assert_eq!(rows[1].line, "12");
            assert_eq!(rows[1].payee, "K Lee");
            assert_eq!(rows[1].section, "PRE-PRODUCTION | WRAP LABOR");
            assert_eq!(rows[1].actual, Some(-1500.0));
            assert_eq!(rows[1].variance_pct, Some(-225.0));
        }

        #[test]
        fn test_hot_budget_workbook() {
            let mut workbook = Workbook::new();
            let sheet = workbook.add_worksheet();
            sheet.write_string(0, 0, "ACME HOT BUDGET").unwrap();
            sheet.write_string(1, 0, "ESTIMATED COST SUMMARY").unwrap();
            sheet.write_string(1, 2, "LINES").unwrap();
            sheet.write_string(1, 3, "BID TOTAL").unwrap();
            sheet.write_string(1, 4, "ACTUAL").unwrap();
            sheet.write_string(1, 5, "VARIANCE").unwrap();
            sheet.write_string(2, 0, "A 1 Pre-Production").unwrap();
            sheet.write_string(2, 2, "1-50").unwrap();
            sheet.write_number(2, 3, 1000).unwrap();
            sheet.write_number(2, 4, 900).unwrap();
            sheet.write_number(2, 5, 100).unwrap();
            let bytes = workbook.save_to_buffer().unwrap();

            let rows = extract_cost_summary(&NativeDecoder, FileFormat::Xlsx, &bytes).unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].section, "Pre-Production");
            assert_eq!(rows[0].bid_total, 1000.0);
            assert_eq!(rows[0].actual, 900.0);
        }
    }
}
