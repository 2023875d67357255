use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ReportType {
    #[serde(rename = "CS")]
    #[schemars(description = "Budgeted vs. actual costs summarized by section")]
    CostSummary,

    #[serde(rename = "PR")]
    #[schemars(description = "Labor payments itemized by line and payee")]
    Payroll,

    #[serde(rename = "PO")]
    #[schemars(description = "Vendor purchase transactions itemized by line and payee")]
    PurchaseOrder,

    #[serde(rename = "OTHER")]
    Other,
}

impl ReportType {
    /// The report types that produce a dataset.
    pub const EXTRACTABLE: [ReportType; 3] = [
        ReportType::CostSummary,
        ReportType::Payroll,
        ReportType::PurchaseOrder,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ReportType::CostSummary => "CS",
            ReportType::Payroll => "PR",
            ReportType::PurchaseOrder => "PO",
            ReportType::Other => "OTHER",
        }
    }

    /// Name of the published table for this type.
    pub fn table_name(&self) -> &'static str {
        match self {
            ReportType::CostSummary => "Cost Summary",
            ReportType::Payroll => "Payroll",
            ReportType::PurchaseOrder => "Purchase Order",
            ReportType::Other => "Other",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Container formats the readers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Xlsx,
    Xlsb,
    Pdf,
}

impl FileFormat {
    pub const DEFAULT_PREFERENCE: [FileFormat; 3] =
        [FileFormat::Xlsx, FileFormat::Xlsb, FileFormat::Pdf];

    /// Detects the format from the extension of a remote path.
    pub fn from_path(path: &str) -> Option<Self> {
        let name = file_name(path);
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => Some(FileFormat::Xlsx),
            "xlsb" => Some(FileFormat::Xlsb),
            "pdf" => Some(FileFormat::Pdf),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Xlsx => ".xlsx",
            FileFormat::Xlsb => ".xlsb",
            FileFormat::Pdf => ".pdf",
        }
    }

    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, FileFormat::Xlsx | FileFormat::Xlsb)
    }
}

/// Last component of a slash separated remote path.
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// A fetched and classified file. Bytes are shared so the record can be handed
/// to a blocking extraction task without copying.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub remote_path: String,
    pub detected_type: ReportType,
    pub format: FileFormat,
    pub raw_bytes: Arc<[u8]>,
}

impl FileRecord {
    pub fn file_name(&self) -> &str {
        file_name(&self.remote_path)
    }
}

#[derive(Debug, Clone)]
pub struct ProjectGroup {
    pub project_name: String,
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CostSummaryRow {
    #[serde(rename = "SECTION")]
    pub section: String,

    #[serde(rename = "BID_TOTAL")]
    pub bid_total: f64,

    #[serde(rename = "ACTUAL")]
    pub actual: f64,

    #[serde(rename = "VARIANCE")]
    pub variance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PayrollRow {
    #[serde(rename = "LINE")]
    pub line: String,

    #[serde(rename = "SECTION")]
    #[schemars(description = "Department label derived from the line number")]
    pub section: String,

    #[serde(rename = "PAYEE")]
    pub payee: String,

    #[serde(rename = "RATE")]
    pub rate: Option<f64>,

    #[serde(rename = "EST")]
    #[schemars(description = "Estimated cost: rate multiplied by days")]
    pub estimate: Option<f64>,

    #[serde(rename = "ACTUAL")]
    pub actual: Option<f64>,

    #[serde(rename = "VARIANCE")]
    pub variance: Option<f64>,

    #[serde(rename = "VAR_PCT")]
    #[schemars(description = "Variance as a percentage of the estimate; missing when the estimate is zero")]
    pub variance_pct: Option<f64>,

    #[serde(rename = "DESCRIPTION")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PurchaseOrderRow {
    #[serde(rename = "LINE")]
    pub line: String,

    #[serde(rename = "PAYEE")]
    pub payee: String,

    #[serde(rename = "PO")]
    pub po: Option<String>,

    #[serde(rename = "DATE")]
    pub date: Option<String>,

    #[serde(rename = "PAYID")]
    pub pay_id: Option<String>,

    #[serde(rename = "ACTUAL")]
    pub actual: Option<f64>,

    #[serde(rename = "DESCRIPTION")]
    pub description: Option<String>,
}

/// A canonical row tagged with the project it was collected from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectRow<R> {
    #[serde(rename = "PROJECT_NAME")]
    pub project_name: String,

    #[serde(flatten)]
    pub row: R,
}

impl<R> ProjectRow<R> {
    pub fn tag(project_name: &str, rows: Vec<R>) -> Vec<ProjectRow<R>> {
        rows.into_iter()
            .map(|row| ProjectRow {
                project_name: project_name.to_string(),
                row,
            })
            .collect()
    }
}

/// The three consolidated datasets of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Datasets {
    pub cost_summary: Vec<ProjectRow<CostSummaryRow>>,
    pub payroll: Vec<ProjectRow<PayrollRow>>,
    pub purchase_order: Vec<ProjectRow<PurchaseOrderRow>>,
}

impl Datasets {
    pub fn len_of(&self, report_type: ReportType) -> usize {
        match report_type {
            ReportType::CostSummary => self.cost_summary.len(),
            ReportType::Payroll => self.payroll.len(),
            ReportType::PurchaseOrder => self.purchase_order.len(),
            ReportType::Other => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cost_summary.is_empty() && self.payroll.is_empty() && self.purchase_order.is_empty()
    }

    /// Rows of one dataset as JSON objects, in dataset order.
    pub fn rows_as_json(&self, report_type: ReportType) -> serde_json::Result<Vec<serde_json::Value>> {
        fn to_values<T: Serialize>(rows: &[T]) -> serde_json::Result<Vec<serde_json::Value>> {
            rows.iter().map(serde_json::to_value).collect()
        }

        match report_type {
            ReportType::CostSummary => to_values(&self.cost_summary),
            ReportType::Payroll => to_values(&self.payroll),
            ReportType::PurchaseOrder => to_values(&self.purchase_order),
            ReportType::Other => Ok(Vec::new()),
        }
    }
}

/// Ordered column names of a published table.
pub fn table_columns(report_type: ReportType) -> &'static [&'static str] {
    match report_type {
        ReportType::CostSummary => &["SECTION", "BID_TOTAL", "ACTUAL", "VARIANCE", "PROJECT_NAME"],
        ReportType::Payroll => &[
            "LINE",
            "SECTION",
            "PAYEE",
            "RATE",
            "EST",
            "ACTUAL",
            "VARIANCE",
            "VAR_PCT",
            "DESCRIPTION",
            "PROJECT_NAME",
        ],
        ReportType::PurchaseOrder => &[
            "LINE",
            "PAYEE",
            "PO",
            "DATE",
            "PAYID",
            "ACTUAL",
            "DESCRIPTION",
            "PROJECT_NAME",
        ],
        ReportType::Other => &[],
    }
}

/// JSON schema of a published row, for sinks that render typed columns.
pub fn row_schema(report_type: ReportType) -> Option<schemars::schema::RootSchema> {
    match report_type {
        ReportType::CostSummary => Some(schemars::schema_for!(ProjectRow<CostSummaryRow>)),
        ReportType::Payroll => Some(schemars::schema_for!(ProjectRow<PayrollRow>)),
        ReportType::PurchaseOrder => Some(schemars::schema_for!(ProjectRow<PurchaseOrderRow>)),
        ReportType::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(FileFormat::from_path("/a/b/Payroll.XLSX"), Some(FileFormat::Xlsx));
        assert_eq!(FileFormat::from_path("/a/PO Log.xlsb"), Some(FileFormat::Xlsb));
        assert_eq!(FileFormat::from_path("/a/summary.pdf"), Some(FileFormat::Pdf));
        assert_eq!(FileFormat::from_path("/a/notes.docx"), None);
        assert_eq!(FileFormat::from_path("/a.pdf/README"), None);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/Projects/Alpha/PR.xlsx"), "PR.xlsx");
        assert_eq!(file_name("/Projects/Alpha/"), "Alpha");
        assert_eq!(file_name("plain"), "plain");
    }

    #[test]
    fn test_project_row_serialization() {
        let rows = ProjectRow::tag(
            "Alpha",
            vec![CostSummaryRow {
                section: "Shooting Crew Labor".to_string(),
                bid_total: 100.0,
                actual: 90.0,
                variance: -10.0,
            }],
        );

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["PROJECT_NAME"], "Alpha");
        assert_eq!(json["SECTION"], "Shooting Crew Labor");
        assert_eq!(json["BID_TOTAL"], 100.0);
    }

    #[test]
    fn test_schema_generation() {
        let schema = row_schema(ReportType::Payroll).unwrap();
        let schema_json = serde_json::to_string_pretty(&schema).unwrap();
        assert!(schema_json.contains("VAR_PCT"));
        assert!(schema_json.contains("PROJECT_NAME"));
        assert!(row_schema(ReportType::Other).is_none());
    }

    #[test]
    fn test_report_type_codes() {
        let json = serde_json::to_string(&ReportType::PurchaseOrder).unwrap();
        assert_eq!(json, "\"PO\"");
        assert_eq!(ReportType::CostSummary.to_string(), "CS");
        assert_eq!(table_columns(ReportType::Payroll).len(), 10);
    }
}
