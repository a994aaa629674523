//! Dataset resolution and the per-(user, dataset) artefact cache

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::fetch::{write_atomic, ArtefactFetcher};
use super::gcs::derive_prefix;
use super::types::{
    DatasetDescription, DatasetFile, FileRegistry, ROLE_LOG_CLEANED, ROLE_LOG_RAW, ROLE_REPORT,
    ROLE_STORE,
};
use crate::config::CoreConfig;
use crate::error::{LogmineError, LogmineResult};
use crate::timefmt;

/// Local cache directory for a (user, dataset) pair. Pure function: any two
/// resolvers configured with the same root agree on the same directory.
pub fn cache_dir_for(cache_root: &Path, user_id: &str, dataset_id: &str) -> PathBuf {
    cache_root.join(user_id).join(dataset_id)
}

/// Resolves dataset descriptions into locally mirrored artefact bundles
#[derive(Debug, Clone)]
pub struct DatasetResolver {
    cache_root: PathBuf,
    default_chat_logs_folder: String,
    fetcher: ArtefactFetcher,
}

impl DatasetResolver {
    /// Create a resolver from the core configuration
    pub fn new(config: &CoreConfig) -> LogmineResult<Self> {
        Ok(Self {
            cache_root: config.cache_root.clone(),
            default_chat_logs_folder: config.chat_logs_folder.clone(),
            fetcher: ArtefactFetcher::new(config.download_timeout_secs)?,
        })
    }

    /// Resolve a dataset description into a locally materialized bundle.
    ///
    /// The description must list at least one file and must include entries
    /// for both the `store` and `report` roles; both documents are downloaded
    /// concurrently and are mandatory, so a transport failure here aborts the
    /// whole resolution. The cleaned log (or, failing that, the raw log) is
    /// mirrored eagerly so the first analysis call never blocks on a network
    /// fetch mid-pipeline.
    pub async fn resolve(
        &self,
        dataset_id: &str,
        description: &DatasetDescription,
        user_id: &str,
    ) -> LogmineResult<DatasetArtefacts> {
        let entries = description.file_entries();
        if entries.is_empty() {
            return Err(LogmineError::missing_artefact(
                "Dataset description does not include artefact files",
            ));
        }

        let registry = FileRegistry::from_entries(entries);
        let store_file = registry.get_by_role(ROLE_STORE).cloned();
        let report_file = registry.get_by_role(ROLE_REPORT).cloned();
        let (Some(store_file), Some(report_file)) = (store_file, report_file) else {
            return Err(LogmineError::missing_artefact(
                "Dataset is missing store.json or report.json artefacts",
            ));
        };

        // Both documents are required before any tool can run
        let (store, report) = tokio::try_join!(
            self.fetcher.fetch_json(&store_file.url),
            self.fetcher.fetch_json(&report_file.url),
        )?;

        let (bucket, prefix, chat_logs_folder) = derive_prefix(
            &report_file.url,
            description.chat_logs_hint(),
            &self.default_chat_logs_folder,
        )?;

        let local_dir = cache_dir_for(&self.cache_root, user_id, dataset_id);
        fs::create_dir_all(&local_dir).await?;

        // Keep the downloaded documents next to the mirrored files for diagnostics
        write_atomic(
            &local_dir.join("store.json"),
            serde_json::to_string_pretty(&store)?.as_bytes(),
        )
        .await?;
        write_atomic(
            &local_dir.join("report.json"),
            serde_json::to_string_pretty(&report)?.as_bytes(),
        )
        .await?;

        let log_file = registry
            .get_by_role(ROLE_LOG_CLEANED)
            .or_else(|| registry.get_by_role(ROLE_LOG_RAW));
        if let Some(log_file) = log_file {
            let target = local_dir.join(log_file.basename());
            if let Err(e) = self.fetcher.mirror_to(&log_file.url, &target).await {
                // The eager mirror is an optimization; ensure_local_file will
                // retry the fetch when the log is actually requested.
                warn!("Eager log mirror failed for {}: {}", log_file.name, e);
            }
        }

        info!(
            "Resolved dataset {} for user {}: bucket={}, prefix={}, {} files",
            dataset_id,
            user_id,
            bucket,
            prefix,
            registry.by_role.len()
        );

        Ok(DatasetArtefacts {
            dataset_id: dataset_id.to_string(),
            user_id: user_id.to_string(),
            store,
            report,
            by_role: registry.by_role,
            by_name: RwLock::new(registry.by_name),
            bucket,
            prefix,
            chat_logs_folder,
            local_dir,
            loaded_at: timefmt::now(),
            fetcher: self.fetcher.clone(),
        })
    }
}

/// The resolved artefact bundle for one (user, dataset) pair.
///
/// Created once per request that activates a dataset and shared read-only
/// from then on; the only mutation is registering newly generated local
/// files into the name index.
#[derive(Debug)]
pub struct DatasetArtefacts {
    dataset_id: String,
    user_id: String,
    store: Value,
    report: Value,
    by_role: HashMap<String, DatasetFile>,
    by_name: RwLock<HashMap<String, DatasetFile>>,
    bucket: String,
    prefix: String,
    chat_logs_folder: String,
    local_dir: PathBuf,
    loaded_at: DateTime<Utc>,
    fetcher: ArtefactFetcher,
}

impl DatasetArtefacts {
    /// Dataset identifier
    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    /// Owning user identifier
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Parsed store document
    pub fn store(&self) -> &Value {
        &self.store
    }

    /// Parsed report document
    pub fn report(&self) -> &Value {
        &self.report
    }

    /// Resolved storage bucket
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Base prefix under which sibling dataset files live
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Chat-log sub-folder name, trailing-slash-normalized
    pub fn chat_logs_folder(&self) -> &str {
        &self.chat_logs_folder
    }

    /// Local cache directory for this dataset
    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    /// When this bundle was resolved
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Return the local path for a cached file, downloading it first if the
    /// mirror is absent.
    ///
    /// Resolution order: exact role match when `role_hint` is given, then
    /// exact name match, then (only without a hint) the identifier itself is
    /// tried as a role. An existing mirror is never re-fetched: canonical
    /// dataset files are immutable once published.
    pub async fn ensure_local_file(
        &self,
        identifier: &str,
        role_hint: Option<&str>,
    ) -> LogmineResult<PathBuf> {
        let mut file = role_hint.and_then(|role| self.by_role.get(role).cloned());
        if file.is_none() {
            file = self.by_name.read().get(identifier).cloned();
        }
        if file.is_none() && role_hint.is_none() {
            file = self.by_role.get(identifier).cloned();
            if file.is_some() {
                // Name/role namespaces overlap here; callers that know which
                // they mean should pass an explicit role hint.
                debug!("Resolved identifier {:?} as a role", identifier);
            }
        }
        let file = file.ok_or_else(|| {
            LogmineError::missing_artefact(format!("Dataset file not found: {identifier}"))
        })?;

        let target = self.local_dir.join(file.basename());
        if !target.exists() {
            self.fetcher.mirror_to(&file.url, &target).await?;
        }
        Ok(target)
    }

    /// Record a file produced by the analytics pipeline so subsequent lookups
    /// by filename succeed without a network round trip.
    pub fn register_local_file(&self, path: &Path) -> LogmineResult<PathBuf> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                LogmineError::invalid_input(format!("Cannot register path without a file name: {path:?}"))
            })?
            .to_string();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file = DatasetFile::new(
            format!("generated:{extension}"),
            &name,
            path.to_string_lossy().into_owned(),
        );
        self.by_name.write().insert(name, file);
        Ok(path.to_path_buf())
    }

    /// Compact projection of this bundle for host-side bookkeeping
    pub fn metadata(&self) -> DatasetMetadata {
        DatasetMetadata {
            dataset_id: self.dataset_id.clone(),
            bucket: self.bucket.clone(),
            gcs_prefix: self.prefix.clone(),
            chat_logs_folder: self.chat_logs_folder.clone(),
            local_dir: self.local_dir.to_string_lossy().into_owned(),
            loaded_at: self.loaded_at,
        }
    }
}

/// Summary record describing a resolved dataset bundle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub dataset_id: String,
    pub bucket: String,
    pub gcs_prefix: String,
    pub chat_logs_folder: String,
    pub local_dir: String,
    #[serde(with = "crate::timefmt")]
    pub loaded_at: DateTime<Utc>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build a minimal bundle without touching the network, for tests in
    /// other modules that only need dataset identity and a cache dir.
    pub(crate) fn bundle(dir: &Path, dataset_id: &str, user_id: &str) -> DatasetArtefacts {
        DatasetArtefacts {
            dataset_id: dataset_id.to_string(),
            user_id: user_id.to_string(),
            store: serde_json::json!({}),
            report: serde_json::json!({}),
            by_role: HashMap::new(),
            by_name: RwLock::new(HashMap::new()),
            bucket: "b".to_string(),
            prefix: "proj/".to_string(),
            chat_logs_folder: "chat_logs/".to_string(),
            local_dir: dir.to_path_buf(),
            loaded_at: timefmt::now(),
            fetcher: ArtefactFetcher::new(5).unwrap(),
        }
    }
}
