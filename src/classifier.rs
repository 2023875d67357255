//! Report type detection.
//!
//! Classification is an ordered decision table: the file name is checked
//! first, then a text snippet of the document. The first matching rule wins,
//! which is what keeps payroll exports from third-party payroll services
//! (rule "wrapbook") out of the payroll dataset.

use crate::decode::{snippet, DocumentDecoder};
use crate::error::DecodeError;
use crate::schema::{file_name, FileFormat, ReportType};
use log::{debug, warn};
use std::sync::Arc;

/// File name fragments that mark a purchase order log.
pub const FILE_NAME_RULES: &[(&[&str], ReportType)] =
    &[(&["po log", "purchase order"], ReportType::PurchaseOrder)];

/// Content fragments, checked in order against the lowercased snippet.
pub const CONTENT_RULES: &[(&[&str], ReportType)] = &[
    (&["purchase order"], ReportType::PurchaseOrder),
    (
        &["cost summary", "hot budget", "film production cost summary"],
        ReportType::CostSummary,
    ),
    (&["wrapbook"], ReportType::Other),
    (&["payroll"], ReportType::Payroll),
];

fn first_match(text: &str, rules: &[(&[&str], ReportType)]) -> Option<ReportType> {
    let text = text.to_lowercase();
    rules
        .iter()
        .find(|(tokens, _)| tokens.iter().any(|token| text.contains(token)))
        .map(|(_, report_type)| *report_type)
}

pub fn classify_file_name(path: &str) -> Option<ReportType> {
    first_match(file_name(path), FILE_NAME_RULES)
}

pub fn classify_snippet(snippet: &str) -> ReportType {
    first_match(snippet, CONTENT_RULES).unwrap_or(ReportType::Other)
}

#[derive(Clone)]
pub struct Classifier {
    decoder: Arc<dyn DocumentDecoder>,
    verbose: bool,
}

impl Classifier {
    pub fn new(decoder: Arc<dyn DocumentDecoder>) -> Self {
        Self {
            decoder,
            verbose: true,
        }
    }

    /// Log classification failures at warn level instead of debug.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Classifies a file, reporting why content sniffing failed.
    pub fn try_classify(&self, path: &str, bytes: &[u8]) -> Result<ReportType, DecodeError> {
        if let Some(report_type) = classify_file_name(path) {
            return Ok(report_type);
        }

        let format = FileFormat::from_path(path)
            .ok_or_else(|| DecodeError::UnsupportedFormat(path.to_string()))?;
        let text = snippet(self.decoder.as_ref(), format, bytes)?;

        Ok(classify_snippet(&text))
    }

    /// Classifies a file; unreadable content is [`ReportType::Other`].
    pub fn classify(&self, path: &str, bytes: &[u8]) -> ReportType {
        match self.try_classify(path, bytes) {
            Ok(report_type) => {
                debug!("Classified {} as {}", path, report_type);
                report_type
            }
            Err(e) => {
                if self.verbose {
                    warn!("Classification error {} at: {}", e, path);
                } else {
                    debug!("Classification error {} at: {}", e, path);
                }
                ReportType::Other
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_table::PdfPage;
    use crate::table::{Cell, Grid};

    struct TextDecoder;

    impl DocumentDecoder for TextDecoder {
        fn first_sheet(&self, _format: FileFormat, bytes: &[u8]) -> Result<Grid, DecodeError> {
            let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::Workbook(e.to_string()))?;
            Ok(Grid::from_rows(
                text.lines().map(|line| vec![Cell::text(line)]).collect(),
            ))
        }

        fn pdf_pages(&self, bytes: &[u8]) -> Result<Vec<PdfPage>, DecodeError> {
            let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::Pdf(e.to_string()))?;
            Ok(vec![PdfPage::from_text(text)])
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(Arc::new(TextDecoder))
    }

    #[test]
    fn test_file_name_rule_wins_without_reading() {
        let c = classifier();
        assert_eq!(
            c.classify("/Alpha/Week 3 PO Log.pdf", &[0xff, 0xfe]),
            ReportType::PurchaseOrder
        );
        assert_eq!(
            c.classify("/Alpha/Purchase Order 12.xlsx", b"payroll"),
            ReportType::PurchaseOrder
        );
    }

    #[test]
    fn test_content_rules_in_order() {
        assert_eq!(classify_snippet("PURCHASE ORDER log and Payroll"), ReportType::PurchaseOrder);
        assert_eq!(classify_snippet("Hot Budget v2"), ReportType::CostSummary);
        assert_eq!(
            classify_snippet("Film Production Cost Summary"),
            ReportType::CostSummary
        );
        assert_eq!(classify_snippet("Weekly Payroll Register"), ReportType::Payroll);
        assert_eq!(classify_snippet("Invoice"), ReportType::Other);
    }

    #[test]
    fn test_wrapbook_excludes_payroll() {
        let c = classifier();
        assert_eq!(
            c.classify("/Alpha/register.pdf", b"Wrapbook Payroll Register"),
            ReportType::Other
        );
        assert_eq!(classify_snippet("payroll by wrapbook"), ReportType::Other);
    }

    #[test]
    fn test_unreadable_content_is_other() {
        let c = classifier();
        assert_eq!(c.classify("/Alpha/payroll.pdf", &[0xff, 0xfe, 0xfd]), ReportType::Other);
        assert_eq!(c.classify("/Alpha/payroll.docx", b"payroll"), ReportType::Other);
        assert!(matches!(
            c.try_classify("/Alpha/payroll.docx", b"payroll"),
            Err(DecodeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let c = classifier();
        let content = b"ACME\nPayroll summary";
        let first = c.classify("/Beta/pr.xlsx", content);
        for _ in 0..5 {
            assert_eq!(c.classify("/Beta/pr.xlsx", content), first);
        }
        assert_eq!(first, ReportType::Payroll);
    }
}
