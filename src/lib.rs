//! # Cost Report Consolidator
//!
//! A library for collecting production cost reports (spreadsheets and PDFs)
//! from a remote folder tree into three consolidated datasets.
//!
//! ## Core Concepts
//!
//! - **Projects**: Every folder directly under the root is one project; its files are found recursively
//! - **Classification**: Each file is typed as cost summary (CS), payroll (PR), purchase order (PO) or other
//! - **Best File**: Per project and type, one file is read, preferring xlsx over xlsb over pdf
//! - **Canonical Rows**: Extractors normalize accounting notation, recover merged cells and derive
//!   payroll estimates, variances and departments
//! - **Datasets**: Rows of all projects, tagged with the project name, are concatenated per type
//!
//! ## Example
//!
//! ```rust,ignore
//! use cost_report_consolidator::*;
//! use std::sync::Arc;
//!
//! let config = ConsolidatorConfig::new("https://www.dropbox.com/home/Productions/2024");
//! let store = Arc::new(LocalStore::new("/mnt/dropbox"));
//!
//! let datasets = gen_data(store, config).await?;
//! datasets.publish_to(&JsonDirectorySink::new("out")).await?;
//! ```

pub mod classifier;
pub mod config;
pub mod consolidate;
pub mod decode;
pub mod departments;
pub mod error;
pub mod extract;
pub mod numeric;
pub mod pdf_table;
pub mod schema;
pub mod selector;
pub mod sink;
pub mod store;
pub mod table;
pub mod traverse;

pub use classifier::{classify_snippet, Classifier};
pub use config::{path_from_link, ConsolidatorConfig};
pub use consolidate::{gen_data, ReportConsolidator, RunReport, TypeReport};
pub use decode::{DocumentDecoder, NativeDecoder};
pub use departments::{department_for_line, DEPARTMENT_RANGES, OTHER_DEPARTMENT};
pub use error::{ConsolidatorError, DecodeError, ExtractionError, Result, StoreError};
pub use extract::{extract_cost_summary, extract_payroll, extract_purchase_order, Contribution};
pub use numeric::parse_accounting;
pub use pdf_table::PdfPage;
pub use schema::*;
pub use selector::select_best_file;
pub use sink::{JsonDirectorySink, PublishSink, PublishedTable};
pub use store::{Entry, EntryKind, LocalStore, MemoryStore, RemoteStore};
pub use traverse::Traverser;

#[cfg(feature = "dropbox")]
pub use store::DropboxStore;

use log::info;
use std::sync::Arc;

/// Consolidates the tree under `config.root` and publishes the three tables
/// to `sink`.
pub async fn consolidate_and_publish(
    store: Arc<dyn RemoteStore>,
    config: ConsolidatorConfig,
    sink: &dyn PublishSink,
) -> Result<RunReport> {
    let consolidator = ReportConsolidator::new(store, config);
    let (datasets, report) = consolidator.gen_data_with_report().await?;

    if datasets.is_empty() {
        info!(
            "No rows collected from {} projects, publishing empty tables",
            report.projects
        );
    }

    datasets.publish_to(sink).await?;
    Ok(report)
}
