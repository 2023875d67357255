//! Publication of the consolidated datasets.

use crate::error::{ConsolidatorError, Result};
use crate::schema::{row_schema, table_columns, Datasets, ReportType};
use async_trait::async_trait;
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One named table handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedTable {
    pub name: String,
    #[serde(skip)]
    pub report_type: ReportType,
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Value>,
}

impl PublishedTable {
    /// File-system friendly form of the table name, e.g. `cost_summary`.
    pub fn slug(&self) -> String {
        self.name.to_lowercase().replace(' ', "_")
    }
}

#[async_trait]
pub trait PublishSink: Send + Sync {
    async fn publish(&self, table: PublishedTable) -> Result<()>;
}

impl Datasets {
    /// The three datasets as named tables, in cost summary, payroll, purchase
    /// order order.
    pub fn tables(&self) -> Result<Vec<PublishedTable>> {
        ReportType::EXTRACTABLE
            .iter()
            .map(|report_type| -> Result<PublishedTable> {
                Ok(PublishedTable {
                    name: report_type.table_name().to_string(),
                    report_type: *report_type,
                    columns: table_columns(*report_type)
                        .iter()
                        .map(|c| c.to_string())
                        .collect(),
                    rows: self.rows_as_json(*report_type)?,
                })
            })
            .collect()
    }

    pub async fn publish_to(&self, sink: &dyn PublishSink) -> Result<()> {
        for table in self.tables()? {
            let name = table.name.clone();
            let rows = table.rows.len();
            sink.publish(table)
                .await
                .map_err(|e| ConsolidatorError::PublishFailed {
                    table: name.clone(),
                    details: e.to_string(),
                })?;
            info!("Published {} rows to table '{}'", rows, name);
        }
        Ok(())
    }
}

/// Writes each table to `<dir>/<slug>.json` and its row schema to
/// `<dir>/<slug>.schema.json`.
#[derive(Debug, Clone)]
pub struct JsonDirectorySink {
    dir: PathBuf,
}

impl JsonDirectorySink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn table_path(&self, table: &PublishedTable) -> PathBuf {
        self.dir.join(format!("{}.json", table.slug()))
    }
}

#[async_trait]
impl PublishSink for JsonDirectorySink {
    async fn publish(&self, table: PublishedTable) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let json = serde_json::to_string_pretty(&table)?;
        tokio::fs::write(self.table_path(&table), json).await?;

        if let Some(schema) = row_schema(table.report_type) {
            let schema_json = serde_json::to_string_pretty(&schema)?;
            let schema_path = self.dir.join(format!("{}.schema.json", table.slug()));
            tokio::fs::write(schema_path, schema_json).await?;
        }

        Ok(())
    }
}
