use super::{join_path, Entry, RemoteStore};
use crate::error::StoreError;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A folder on the local filesystem, e.g. a synced copy of the remote tree.
/// Store paths are slash separated and relative to `base`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    base: PathBuf,
}

impl LocalStore {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.base.clone(), |acc, part| acc.join(part))
    }
}

fn store_error(path: &str, error: io::Error) -> StoreError {
    match error.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(path.to_string()),
        io::ErrorKind::PermissionDenied => StoreError::Denied(path.to_string()),
        _ => StoreError::Transport(format!("{}: {}", path, error)),
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn list(&self, path: &str) -> Result<Vec<Entry>, StoreError> {
        let mut dir = fs::read_dir(self.resolve(path))
            .await
            .map_err(|e| store_error(path, e))?;

        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await.map_err(|e| store_error(path, e))? {
            let name = item.file_name().to_string_lossy().into_owned();
            let file_type = item.file_type().await.map_err(|e| store_error(path, e))?;
            let child = join_path(path, &name);

            if file_type.is_dir() {
                entries.push(Entry::folder(child));
            } else if file_type.is_file() {
                entries.push(Entry::file(child));
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        fs::read(self.resolve(path))
            .await
            .map_err(|e| store_error(path, e))
    }
}
