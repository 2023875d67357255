use super::{Entry, RemoteStore};
use crate::error::StoreError;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

const DROPBOX_API_URL: &str = "https://api.dropboxapi.com/2";
const DROPBOX_CONTENT_URL: &str = "https://content.dropboxapi.com/2";

/// Dropbox files API client authenticated with an access token.
#[derive(Clone)]
pub struct DropboxStore {
    client: Client,
    access_token: String,
    api_url: String,
    content_url: String,
}

#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<ListedEntry>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ListedEntry {
    #[serde(rename = ".tag")]
    tag: String,
    path_display: Option<String>,
    path_lower: Option<String>,
}

impl ListedEntry {
    /// Files and folders; deleted entries are dropped.
    fn into_entry(self) -> Option<Entry> {
        let path = self.path_display.or(self.path_lower)?;
        match self.tag.as_str() {
            "file" => Some(Entry::file(path)),
            "folder" => Some(Entry::folder(path)),
            _ => None,
        }
    }
}

/// Dropbox addresses the root folder as the empty string.
fn api_path(path: &str) -> &str {
    if path == "/" {
        ""
    } else {
        path.trim_end_matches('/')
    }
}

impl DropboxStore {
    pub fn new(access_token: String) -> Self {
        Self {
            client: Client::new(),
            access_token,
            api_url: DROPBOX_API_URL.to_string(),
            content_url: DROPBOX_CONTENT_URL.to_string(),
        }
    }

    /// Points the client at another API host, e.g. a local mock server.
    pub fn with_base_urls(mut self, api_url: String, content_url: String) -> Self {
        self.api_url = api_url;
        self.content_url = content_url;
        self
    }

    async fn post_json(
        &self,
        endpoint: &str,
        body: serde_json::Value,
        path: &str,
    ) -> Result<ListFolderResponse, StoreError> {
        let res = self
            .client
            .post(format!("{}/{}", self.api_url, endpoint))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let res = check_status(res, path).await?;
        res.json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }
}

async fn check_status(res: Response, path: &str) -> Result<Response, StoreError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let error_text = res.text().await.unwrap_or_default();
    Err(status_error(status, path, &error_text))
}

fn status_error(status: StatusCode, path: &str, error_text: &str) -> StoreError {
    match status {
        StatusCode::CONFLICT => StoreError::NotFound(format!("{} ({})", path, error_text)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::Denied(format!("{} (status {})", path, status))
        }
        _ => StoreError::Transport(format!(
            "{} (status {}): {}",
            path, status, error_text
        )),
    }
}

#[async_trait]
impl RemoteStore for DropboxStore {
    async fn list(&self, path: &str) -> Result<Vec<Entry>, StoreError> {
        let mut page = self
            .post_json(
                "files/list_folder",
                json!({ "path": api_path(path), "recursive": false }),
                path,
            )
            .await?;

        let mut entries = Vec::new();
        loop {
            entries.extend(page.entries.into_iter().filter_map(ListedEntry::into_entry));
            if !page.has_more {
                break;
            }

            debug!("Continuing listing of {} ({} entries so far)", path, entries.len());
            page = self
                .post_json(
                    "files/list_folder/continue",
                    json!({ "cursor": page.cursor }),
                    path,
                )
                .await?;
        }

        Ok(entries)
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let arg = json!({ "path": api_path(path) }).to_string();
        let res = self
            .client
            .post(format!("{}/files/download", self.content_url))
            .bearer_auth(&self.access_token)
            .header("Dropbox-API-Arg", arg)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let bytes = check_status(res, path)
            .await?
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}
