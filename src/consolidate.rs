//! The per-project pipeline and the reduction into [`Datasets`].
//!
//! Projects run concurrently up to `max_concurrent_projects`. Each project
//! lists and classifies its files, selects the best file per report type and
//! extracts it on the blocking pool. Project results are reduced into the
//! datasets only after every project has been joined.

use crate::classifier::Classifier;
use crate::config::ConsolidatorConfig;
use crate::decode::{DocumentDecoder, NativeDecoder};
use crate::error::{ExtractionError, Result};
use crate::extract::{extract_cost_summary, extract_payroll, extract_purchase_order, Contribution};
use crate::schema::{
    CostSummaryRow, Datasets, FileFormat, FileRecord, PayrollRow, ProjectRow, PurchaseOrderRow,
    ReportType,
};
use crate::selector::select_best_file;
use crate::store::{Entry, RemoteStore};
use crate::traverse::Traverser;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Outcome counts for one report type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeReport {
    /// Projects where a file of this type was selected.
    pub selected: usize,
    pub with_rows: usize,
    pub empty: usize,
    pub failed: usize,
    pub rows: usize,
}

impl TypeReport {
    fn record<R>(&mut self, contribution: &Option<Contribution<R>>) {
        let Some(contribution) = contribution else {
            return;
        };

        self.selected += 1;
        self.rows += contribution.row_count();
        match contribution {
            Contribution::Rows(_) => self.with_rows += 1,
            Contribution::Empty => self.empty += 1,
            Contribution::Failed(_) => self.failed += 1,
        }
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub projects: usize,
    pub files_seen: usize,
    pub other_files: usize,
    pub cost_summary: TypeReport,
    pub payroll: TypeReport,
    pub purchase_order: TypeReport,
}

impl RunReport {
    pub fn for_type(&self, report_type: ReportType) -> Option<&TypeReport> {
        match report_type {
            ReportType::CostSummary => Some(&self.cost_summary),
            ReportType::Payroll => Some(&self.payroll),
            ReportType::PurchaseOrder => Some(&self.purchase_order),
            ReportType::Other => None,
        }
    }
}

/// What one project adds to the run. `None` means no file of that type.
struct ProjectOutcome {
    project_name: String,
    files_seen: usize,
    other_files: usize,
    cost_summary: Option<Contribution<CostSummaryRow>>,
    payroll: Option<Contribution<PayrollRow>>,
    purchase_order: Option<Contribution<PurchaseOrderRow>>,
}

pub struct ReportConsolidator {
    store: Arc<dyn RemoteStore>,
    decoder: Arc<dyn DocumentDecoder>,
    config: ConsolidatorConfig,
    permits: Arc<Semaphore>,
}

impl ReportConsolidator {
    pub fn new(store: Arc<dyn RemoteStore>, config: ConsolidatorConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            store,
            decoder: Arc::new(NativeDecoder),
            config,
            permits,
        }
    }

    /// Replaces the calamine and pdf-extract readers.
    pub fn with_decoder(mut self, decoder: Arc<dyn DocumentDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn config(&self) -> &ConsolidatorConfig {
        &self.config
    }

    pub async fn gen_data(&self) -> Result<Datasets> {
        let (datasets, _) = self.gen_data_with_report().await?;
        Ok(datasets)
    }

    /// Runs the pipeline over every project under the configured root. Only a
    /// failure to list the root itself is an error.
    pub async fn gen_data_with_report(&self) -> Result<(Datasets, RunReport)> {
        self.config.validate()?;

        let root = self.config.root_path();
        let classifier = Classifier::new(Arc::clone(&self.decoder))
            .with_verbose(self.config.verbose_classification);
        let traverser = Traverser::new(Arc::clone(&self.store), classifier, Arc::clone(&self.permits));

        let projects = traverser.project_entries(&root).await?;
        info!("Found {} projects under {}", projects.len(), root);

        let outcomes: Vec<ProjectOutcome> = stream::iter(projects)
            .map(|entry| self.process_project(&traverser, entry))
            .buffer_unordered(self.config.max_concurrent_projects.max(1))
            .collect()
            .await;

        let mut datasets = Datasets::default();
        let mut report = RunReport {
            projects: outcomes.len(),
            ..RunReport::default()
        };

        for outcome in outcomes {
            report.files_seen += outcome.files_seen;
            report.other_files += outcome.other_files;
            report.cost_summary.record(&outcome.cost_summary);
            report.payroll.record(&outcome.payroll);
            report.purchase_order.record(&outcome.purchase_order);

            let name = outcome.project_name.as_str();
            if let Some(contribution) = outcome.cost_summary {
                datasets
                    .cost_summary
                    .extend(ProjectRow::tag(name, contribution.into_rows()));
            }
            if let Some(contribution) = outcome.payroll {
                datasets
                    .payroll
                    .extend(ProjectRow::tag(name, contribution.into_rows()));
            }
            if let Some(contribution) = outcome.purchase_order {
                datasets
                    .purchase_order
                    .extend(ProjectRow::tag(name, contribution.into_rows()));
            }
        }

        info!(
            "Consolidated {} cost summary, {} payroll and {} purchase order rows from {} files",
            datasets.cost_summary.len(),
            datasets.payroll.len(),
            datasets.purchase_order.len(),
            report.files_seen
        );

        Ok((datasets, report))
    }

    async fn process_project(&self, traverser: &Traverser, entry: Entry) -> ProjectOutcome {
        let group = traverser.project_group(&entry).await;
        debug!(
            "Project {}: {} readable files",
            group.project_name,
            group.files.len()
        );

        let files = &group.files;
        let name = group.project_name.as_str();
        let (cost_summary, payroll, purchase_order) = futures::join!(
            self.contribute(name, files, ReportType::CostSummary, extract_cost_summary),
            self.contribute(name, files, ReportType::Payroll, extract_payroll),
            self.contribute(name, files, ReportType::PurchaseOrder, extract_purchase_order),
        );

        ProjectOutcome {
            files_seen: files.len(),
            other_files: files
                .iter()
                .filter(|f| f.detected_type == ReportType::Other)
                .count(),
            cost_summary,
            payroll,
            purchase_order,
            project_name: group.project_name,
        }
    }

    /// Selects and extracts the best file of `report_type`.
    async fn contribute<R, F>(
        &self,
        project: &str,
        files: &[FileRecord],
        report_type: ReportType,
        extractor: F,
    ) -> Option<Contribution<R>>
    where
        R: Send + 'static,
        F: FnOnce(&dyn DocumentDecoder, FileFormat, &[u8]) -> std::result::Result<Vec<R>, ExtractionError>
            + Send
            + 'static,
    {
        let Some(record) = select_best_file(report_type, files, &self.config.file_preference) else {
            debug!("Project {}: no {} file", project, report_type);
            return None;
        };
        debug!("Project {}: {} from {}", project, report_type, record.remote_path);

        let contribution = Contribution::from_result(self.run_extractor(record, extractor).await);
        match &contribution {
            Contribution::Rows(rows) => {
                debug!("{}: {} {} rows", record.remote_path, rows.len(), report_type)
            }
            Contribution::Empty => debug!("{}: no {} rows", record.remote_path, report_type),
            Contribution::Failed(e) => warn!(
                "Extracting {} from {} failed: {}",
                report_type, record.remote_path, e
            ),
        }

        Some(contribution)
    }

    async fn run_extractor<R, F>(
        &self,
        record: &FileRecord,
        extractor: F,
    ) -> std::result::Result<Vec<R>, ExtractionError>
    where
        R: Send + 'static,
        F: FnOnce(&dyn DocumentDecoder, FileFormat, &[u8]) -> std::result::Result<Vec<R>, ExtractionError>
            + Send
            + 'static,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ExtractionError::TaskAborted(e.to_string()))?;

        let decoder = Arc::clone(&self.decoder);
        let bytes = Arc::clone(&record.raw_bytes);
        let format = record.format;

        tokio::task::spawn_blocking(move || extractor(decoder.as_ref(), format, &bytes))
            .await
            .map_err(|e| ExtractionError::TaskAborted(e.to_string()))?
    }
}

/// Consolidates every project under `config.root` with the native readers.
pub async fn gen_data(store: Arc<dyn RemoteStore>, config: ConsolidatorConfig) -> Result<Datasets> {
    ReportConsolidator::new(store, config).gen_data().await
}
