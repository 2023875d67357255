use super::{Entry, RemoteStore};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// An in-memory folder tree, for tests and dry runs over fixture files.
///
/// Parent folders are registered implicitly when a file is added. Failures can
/// be injected per path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, Vec<u8>>,
    folders: BTreeSet<String>,
    failures: HashMap<String, StoreError>,
}

fn normalize(path: &str) -> String {
    path.trim_end_matches('/').to_string()
}

fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        let path = normalize(path);
        self.register_parents(&path);
        self.files.insert(path, bytes.into());
        self
    }

    pub fn with_folder(mut self, path: &str) -> Self {
        let path = normalize(path);
        self.register_parents(&path);
        self.folders.insert(path);
        self
    }

    /// Makes both listing and fetching `path` fail with `error`.
    pub fn with_failure(mut self, path: &str, error: StoreError) -> Self {
        self.failures.insert(normalize(path), error);
        self
    }

    fn register_parents(&mut self, path: &str) {
        let mut current = parent(path);
        while let Some(folder) = current {
            self.folders.insert(folder.to_string());
            current = parent(folder);
        }
    }

    fn check_failure(&self, path: &str) -> Result<(), StoreError> {
        match self.failures.get(path) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list(&self, path: &str) -> Result<Vec<Entry>, StoreError> {
        let path = normalize(path);
        self.check_failure(&path)?;

        if !self.folders.contains(&path) {
            return Err(StoreError::NotFound(path));
        }

        let folders = self
            .folders
            .iter()
            .filter(|folder| *folder != &path && parent(folder) == Some(path.as_str()))
            .map(|folder| Entry::folder(folder.clone()));
        let files = self
            .files
            .keys()
            .filter(|file| parent(file) == Some(path.as_str()))
            .map(|file| Entry::file(file.clone()));

        let mut entries: Vec<Entry> = folders.chain(files).collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let path = normalize(path);
        self.check_failure(&path)?;
        self.files
            .get(&path)
            .cloned()
            .ok_or(StoreError::NotFound(path))
    }
}
