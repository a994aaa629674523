//! Authoritative session blob storage backends
//!
//! The blob store is the system of record for session transcripts: cheap,
//! durable, addressable by deterministic object key. Backends implement
//! [`SessionBlobStore`]; the GCS backend speaks the storage HTTP API through
//! reqwest, the filesystem backend serves local development and tests.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::dataset::fetch::write_atomic;
use crate::error::{LogmineError, LogmineResult};

/// Session blob storage trait
#[async_trait]
pub trait SessionBlobStore: Send + Sync {
    /// Read the object at `key`, `None` when absent
    async fn read(&self, key: &str) -> LogmineResult<Option<String>>;

    /// Write (or overwrite) the object at `key`
    async fn write(&self, key: &str, body: &str) -> LogmineResult<()>;

    /// List object keys under `prefix`
    async fn list(&self, prefix: &str) -> LogmineResult<Vec<String>>;
}

/// Google Cloud Storage backend.
///
/// Credentials are the host's concern: an optional bearer token is attached
/// verbatim when supplied; buckets with public or ambient access need none.
pub struct GcsBlobStore {
    client: Client,
    bucket: String,
    bearer_token: Option<String>,
    timeout_secs: u64,
}

impl GcsBlobStore {
    /// Create a backend for the given bucket
    pub fn new(bucket: impl Into<String>, timeout_secs: u64) -> LogmineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LogmineError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            bucket: bucket.into(),
            bearer_token: None,
            timeout_secs,
        })
    }

    /// Attach a bearer token to every request
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn object_url(&self, key: &str) -> String {
        format!("https://storage.googleapis.com/{}/{}", self.bucket, key)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn map_error(&self, error: reqwest::Error) -> LogmineError {
        if error.is_timeout() {
            LogmineError::timeout(self.timeout_secs)
        } else {
            LogmineError::storage(format!("GCS request failed: {error}"))
        }
    }
}

#[async_trait]
impl SessionBlobStore for GcsBlobStore {
    async fn read(&self, key: &str) -> LogmineResult<Option<String>> {
        let response = self
            .authorize(self.client.get(self.object_url(key)))
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status().map_err(|e| self.map_error(e))?;
        let body = response.text().await.map_err(|e| self.map_error(e))?;
        Ok(Some(body))
    }

    async fn write(&self, key: &str, body: &str) -> LogmineResult<()> {
        let url = format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o",
            self.bucket
        );
        let response = self
            .authorize(
                self.client
                    .post(&url)
                    .query(&[("uploadType", "media"), ("name", key)])
                    .header("content-type", "application/json")
                    .body(body.to_string()),
            )
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        response.error_for_status().map_err(|e| self.map_error(e))?;

        debug!("Wrote session blob gs://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> LogmineResult<Vec<String>> {
        let url = format!(
            "https://storage.googleapis.com/storage/v1/b/{}/o",
            self.bucket
        );
        let mut keys = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).query(&[("prefix", prefix)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = self
                .authorize(request)
                .send()
                .await
                .map_err(|e| self.map_error(e))?
                .error_for_status()
                .map_err(|e| self.map_error(e))?;
            let page: serde_json::Value = response.json().await.map_err(|e| self.map_error(e))?;

            if let Some(items) = page.get("items").and_then(|v| v.as_array()) {
                keys.extend(
                    items
                        .iter()
                        .filter_map(|item| item.get("name").and_then(|n| n.as_str()))
                        .map(str::to_string),
                );
            }
            match page.get("nextPageToken").and_then(|t| t.as_str()) {
                Some(token) => page_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(keys)
    }
}

/// Filesystem-backed blob storage: object keys map onto a directory tree.
/// Used for local development and tests; writes keep the same
/// atomic-visibility discipline as the artefact cache.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl SessionBlobStore for FsBlobStore {
    async fn read(&self, key: &str) -> LogmineResult<Option<String>> {
        match fs::read_to_string(self.object_path(key)).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LogmineError::storage(format!(
                "Failed to read session blob {key}: {e}"
            ))),
        }
    }

    async fn write(&self, key: &str, body: &str) -> LogmineResult<()> {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        write_atomic(&path, body.as_bytes()).await?;
        debug!("Wrote session blob {:?}", path);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> LogmineResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(LogmineError::storage(format!(
                        "Failed to list session blobs: {e}"
                    )))
                }
            };
            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                LogmineError::storage(format!("Failed to list session blobs: {e}"))
            })? {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    let key = relative.to_string_lossy().replace('\\', "/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}
