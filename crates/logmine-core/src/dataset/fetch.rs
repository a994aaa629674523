//! Timeout-bounded artefact downloads with atomic cache visibility

use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use super::gcs::fetchable_url;
use crate::error::{LogmineError, LogmineResult};

/// HTTP fetcher shared by the resolver for all artefact downloads.
///
/// A single client carries the configured timeout; timeouts surface as
/// `LogmineError::Timeout`, other transport failures as `LogmineError::Http`.
#[derive(Debug, Clone)]
pub struct ArtefactFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ArtefactFetcher {
    /// Create a fetcher with the given per-request timeout
    pub fn new(timeout_secs: u64) -> LogmineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LogmineError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// The configured timeout ceiling in seconds
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Build a fetcher around a pre-configured client, so tests can pin the
    /// storage hostname to a local listener.
    #[cfg(test)]
    pub(crate) fn with_client(client: Client, timeout_secs: u64) -> Self {
        Self {
            client,
            timeout_secs,
        }
    }

    /// Download and parse a JSON document
    pub async fn fetch_json(&self, url: &str) -> LogmineResult<Value> {
        let response = self
            .client
            .get(fetchable_url(url)?)
            .send()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;
        let response = response
            .error_for_status()
            .map_err(|e| self.map_transport_error(url, e))?;
        let document = response
            .json::<Value>()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;
        Ok(document)
    }

    /// Download a remote artefact into `target`.
    ///
    /// The body is written to a uniquely named temp file next to the target
    /// and renamed into place, so a concurrent reader never observes a
    /// half-written mirror. When two populators race, the slower rename wins
    /// and the contents are byte-identical for canonical artefacts.
    pub async fn mirror_to(&self, url: &str, target: &Path) -> LogmineResult<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let response = self
            .client
            .get(fetchable_url(url)?)
            .send()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;
        let response = response
            .error_for_status()
            .map_err(|e| self.map_transport_error(url, e))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;

        write_atomic(target, &body).await?;
        debug!("Mirrored {} -> {:?} ({} bytes)", url, target, body.len());
        Ok(())
    }

    fn map_transport_error(&self, url: &str, error: reqwest::Error) -> LogmineError {
        if error.is_timeout() {
            LogmineError::timeout(self.timeout_secs)
        } else {
            LogmineError::Http(format!("Failed to fetch {url}: {error}"))
        }
    }
}

/// Write `body` to `target` with atomic visibility: the bytes land in a
/// uniquely named temp file in the same directory and are renamed into place.
pub(crate) async fn write_atomic(target: &Path, body: &[u8]) -> LogmineResult<()> {
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LogmineError::invalid_input(format!("Invalid cache target: {target:?}")))?;
    let temp_path = target.with_file_name(format!(".{file_name}.{}.part", uuid::Uuid::new_v4()));

    if let Err(e) = fs::write(&temp_path, body).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(LogmineError::Io(format!(
            "Failed to write cache file {temp_path:?}: {e}"
        )));
    }
    if let Err(e) = fs::rename(&temp_path, target).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(LogmineError::Io(format!(
            "Failed to publish cache file {target:?}: {e}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_records_timeout_ceiling() {
        let fetcher = ArtefactFetcher::new(120).unwrap();
        assert_eq!(fetcher.timeout_secs(), 120);
    }

    #[tokio::test]
    async fn test_mirror_rejects_unsupported_scheme() {
        let fetcher = ArtefactFetcher::new(5).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let result = fetcher
            .mirror_to("ftp://host/file.xes", &dir.path().join("file.xes"))
            .await;
        assert!(matches!(result, Err(LogmineError::Config(_))));
    }

    #[tokio::test]
    async fn test_write_atomic_publishes_full_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("store.json");

        write_atomic(&target, b"{\"a\": 1}").await.unwrap();
        assert_eq!(fs::read(&target).await.unwrap(), b"{\"a\": 1}");

        // No temp droppings left behind
        let mut entries = fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name());
        }
        assert_eq!(names, vec![std::ffi::OsString::from("store.json")]);
    }

    #[tokio::test]
    async fn test_write_atomic_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("log.xes");

        write_atomic(&target, b"first").await.unwrap();
        write_atomic(&target, b"second").await.unwrap();
        assert_eq!(fs::read(&target).await.unwrap(), b"second");
    }
}
