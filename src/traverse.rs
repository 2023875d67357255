//! Recursive, concurrent listing of the project tree.
//!
//! Every entry of a folder is handled concurrently and joined before the
//! folder's files are returned, so a project's files come back in traversal
//! order. Downloads and classification share one semaphore; a permit is never
//! held while descending into a sub-folder.

use crate::classifier::{classify_file_name, Classifier};
use crate::error::{ConsolidatorError, Result};
use crate::schema::{FileFormat, FileRecord, ProjectGroup, ReportType};
use crate::store::{Entry, RemoteStore};
use async_recursion::async_recursion;
use futures::future::join_all;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Clone)]
pub struct Traverser {
    store: Arc<dyn RemoteStore>,
    classifier: Classifier,
    permits: Arc<Semaphore>,
}

impl Traverser {
    pub fn new(store: Arc<dyn RemoteStore>, classifier: Classifier, permits: Arc<Semaphore>) -> Self {
        Self {
            store,
            classifier,
            permits,
        }
    }

    /// Folders directly under `root`, one per project. Files at the top level
    /// belong to no project and are skipped.
    pub async fn project_entries(&self, root: &str) -> Result<Vec<Entry>> {
        let entries = self
            .store
            .list(root)
            .await
            .map_err(|source| ConsolidatorError::RootUnavailable {
                path: root.to_string(),
                source,
            })?;

        Ok(entries
            .into_iter()
            .filter(|entry| {
                if !entry.is_folder() {
                    debug!("Skipping top-level file {}", entry.path);
                }
                entry.is_folder()
            })
            .collect())
    }

    /// The project folder `entry` with every classified file below it.
    pub async fn project_group(&self, entry: &Entry) -> ProjectGroup {
        ProjectGroup {
            project_name: entry.name().to_string(),
            files: self.list_files(&entry.path).await,
        }
    }

    /// Every readable file below `path`, fetched and classified. A folder that
    /// cannot be listed contributes nothing.
    #[async_recursion]
    pub async fn list_files(&self, path: &str) -> Vec<FileRecord> {
        let listing = match self.permits.acquire().await {
            Ok(_permit) => self.store.list(path).await,
            Err(e) => {
                warn!("Worker pool closed while listing {}: {}", path, e);
                return Vec::new();
            }
        };

        let entries = match listing {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Listing {} failed: {}", path, e);
                return Vec::new();
            }
        };

        let children = entries.into_iter().map(|entry| async move {
            if entry.is_folder() {
                self.list_files(&entry.path).await
            } else {
                self.load_file(entry.path).await.into_iter().collect()
            }
        });

        join_all(children).await.into_iter().flatten().collect()
    }

    async fn load_file(&self, path: String) -> Option<FileRecord> {
        let Some(format) = FileFormat::from_path(&path) else {
            let by_name = classify_file_name(&path).unwrap_or(ReportType::Other);
            debug!("Skipping {} ({}): no reader for this format", path, by_name);
            return None;
        };

        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!("Worker pool closed while fetching {}: {}", path, e);
                return None;
            }
        };

        let raw_bytes: Arc<[u8]> = match self.store.fetch(&path).await {
            Ok(bytes) => Arc::from(bytes),
            Err(e) => {
                warn!("Fetching {} failed: {}", path, e);
                return None;
            }
        };

        let classifier = self.classifier.clone();
        let task_path = path.clone();
        let task_bytes = Arc::clone(&raw_bytes);
        let detected_type =
            match tokio::task::spawn_blocking(move || classifier.classify(&task_path, &task_bytes))
                .await
            {
                Ok(report_type) => report_type,
                Err(e) => {
                    warn!("Classification task for {} aborted: {}", path, e);
                    ReportType::Other
                }
            };

        Some(FileRecord {
            remote_path: path,
            detected_type,
            format,
            raw_bytes,
        })
    }
}
