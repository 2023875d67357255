use crate::error::{ConsolidatorError, Result};
use crate::schema::FileFormat;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const SHARED_LINK_KEY: &str = "sh/";
const HOME_LINK_KEY: &str = "home/";

/// Settings of one consolidation run.
///
/// Every field except `root` has a default, so the smallest valid JSON
/// configuration is `{"root": "/Projects"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConsolidatorConfig {
    /// Store path of the root folder, or a shared link to it.
    pub root: String,

    /// Upper bound on list, fetch and decode work in flight.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Project pipelines processed at the same time.
    #[serde(default = "default_max_concurrent_projects")]
    pub max_concurrent_projects: usize,

    /// Formats in order of preference when several files share a type.
    #[serde(default = "default_file_preference")]
    pub file_preference: Vec<FileFormat>,

    /// Log classification failures at warn level.
    #[serde(default = "default_verbose_classification")]
    pub verbose_classification: bool,
}

fn default_max_concurrency() -> usize {
    8
}

fn default_max_concurrent_projects() -> usize {
    4
}

fn default_file_preference() -> Vec<FileFormat> {
    FileFormat::DEFAULT_PREFERENCE.to_vec()
}

fn default_verbose_classification() -> bool {
    true
}

impl ConsolidatorConfig {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            max_concurrency: default_max_concurrency(),
            max_concurrent_projects: default_max_concurrent_projects(),
            file_preference: default_file_preference(),
            verbose_classification: default_verbose_classification(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.root.trim().is_empty() {
            return Err(ConsolidatorError::InvalidConfig(
                "root must not be empty".to_string(),
            ));
        }

        if self.max_concurrency == 0 || self.max_concurrent_projects == 0 {
            return Err(ConsolidatorError::InvalidConfig(
                "concurrency limits must be at least 1".to_string(),
            ));
        }

        if self.file_preference.is_empty() {
            return Err(ConsolidatorError::InvalidConfig(
                "file_preference must name at least one format".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = self.file_preference.iter().find(|f| !seen.insert(**f)) {
            return Err(ConsolidatorError::InvalidConfig(format!(
                "file_preference lists {:?} more than once",
                duplicate
            )));
        }

        Ok(())
    }

    /// The store path of the root folder.
    pub fn root_path(&self) -> String {
        path_from_link(&self.root)
    }
}

/// Converts a shared link to a store path.
///
/// `https://www.dropbox.com/sh/abc/Projects?dl=0` becomes `/abc/Projects` and
/// `https://www.dropbox.com/home/Projects` becomes `/Projects`. Anything that
/// is not a URL is returned trimmed.
pub fn path_from_link(link: &str) -> String {
    let link = link.trim();
    if !link.starts_with("http://") && !link.starts_with("https://") {
        return link.to_string();
    }

    if let Some(idx) = link.find(SHARED_LINK_KEY) {
        let rest = &link[idx + SHARED_LINK_KEY.len() - 1..];
        let end = rest.find('?').unwrap_or(rest.len());
        return rest[..end].to_string();
    }

    if let Some(idx) = link.find(HOME_LINK_KEY) {
        return link[idx + HOME_LINK_KEY.len() - 1..].to_string();
    }

    link.to_string()
}
