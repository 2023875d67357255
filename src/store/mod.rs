//! Remote file stores.
//!
//! The pipeline only needs two capabilities from a store: list the direct
//! children of a folder and download a file. [`MemoryStore`] backs tests,
//! [`LocalStore`] reads a synced folder on disk and `DropboxStore` (feature
//! `dropbox`) talks to the Dropbox HTTP API.

mod local;
mod memory;

#[cfg(feature = "dropbox")]
mod dropbox;

pub use local::LocalStore;
pub use memory::MemoryStore;

#[cfg(feature = "dropbox")]
pub use dropbox::DropboxStore;

use crate::error::StoreError;
use crate::schema::file_name;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// A direct child of a listed folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub kind: EntryKind,
}

impl Entry {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    pub fn folder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Folder,
        }
    }

    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Direct children of the folder at `path`.
    async fn list(&self, path: &str) -> Result<Vec<Entry>, StoreError>;

    /// Full content of the file at `path`.
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError>;
}

/// Joins a folder path and a child name with a single slash.
pub(crate) fn join_path(folder: &str, name: &str) -> String {
    format!("{}/{}", folder.trim_end_matches('/'), name)
}
