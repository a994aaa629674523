//! Chat history manager
//!
//! Orchestrates session lifecycle for one (user, dataset) pair: loading,
//! creation, persistence through the authoritative blob store and the
//! optional document-database mirror, and metadata projection.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::mirror::SessionMirrorStore;
use super::storage::SessionBlobStore;
use super::types::{ChatSession, SessionMetadata};
use crate::dataset::gcs::normalize_folder;
use crate::dataset::DatasetArtefacts;
use crate::error::LogmineResult;
use crate::timefmt;

/// Manages chat sessions for one (user, dataset) pair
pub struct ChatHistoryManager {
    bucket: String,
    prefix: String,
    folder: String,
    user_id: String,
    dataset_id: String,
    blob: Arc<dyn SessionBlobStore>,
    mirror: Option<Arc<dyn SessionMirrorStore>>,
}

impl ChatHistoryManager {
    /// Create a manager. `prefix` and `folder` are slash-normalized; passing
    /// `None` for `mirror` runs blob-only.
    pub fn new(
        bucket: impl Into<String>,
        prefix: &str,
        folder: &str,
        user_id: impl Into<String>,
        dataset_id: impl Into<String>,
        blob: Arc<dyn SessionBlobStore>,
        mirror: Option<Arc<dyn SessionMirrorStore>>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: normalize_folder(prefix),
            folder: normalize_folder(folder),
            user_id: user_id.into(),
            dataset_id: dataset_id.into(),
            blob,
            mirror,
        }
    }

    /// Create a manager addressing the chat-log area of a resolved dataset
    pub fn for_dataset(
        artefacts: &DatasetArtefacts,
        blob: Arc<dyn SessionBlobStore>,
        mirror: Option<Arc<dyn SessionMirrorStore>>,
    ) -> Self {
        Self::new(
            artefacts.bucket(),
            artefacts.prefix(),
            artefacts.chat_logs_folder(),
            artefacts.user_id(),
            artefacts.dataset_id(),
            blob,
            mirror,
        )
    }

    /// Chat-log folder, trailing-slash-normalized
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Canonical storage key of a session: `prefix + folder + id + ".json"`.
    /// Deterministic, so re-saving the same session overwrites in place.
    pub fn session_key(&self, session_id: &str) -> String {
        format!("{}{}{}.json", self.prefix, self.folder, session_id)
    }

    /// Load a session by id.
    ///
    /// The authoritative blob is tried first; when it is absent and a mirror
    /// is configured, the mirror serves as fallback read path. Absence from
    /// both is not an error: it signals "create a new session".
    pub async fn load(&self, session_id: &str) -> LogmineResult<Option<ChatSession>> {
        let key = self.session_key(session_id);

        if let Some(body) = self.blob.read(&key).await? {
            let session = self.adopt(serde_json::from_str(&body)?, session_id);
            debug!("Loaded session {} from blob store", session_id);
            return Ok(Some(session));
        }

        if let Some(mirror) = &self.mirror {
            if let Some(session) = mirror
                .find(&self.user_id, &self.dataset_id, session_id)
                .await?
            {
                debug!("Loaded session {} from mirror", session_id);
                return Ok(Some(self.adopt(session, session_id)));
            }
        }

        Ok(None)
    }

    /// Create a fresh session. Without an explicit id one is synthesized from
    /// the current UTC time (`session-YYYYMMDD-HHMMSS`), so identifiers are
    /// human-legible and sort chronologically.
    pub fn create(&self, session_id: Option<&str>) -> ChatSession {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => timefmt::now().format("session-%Y%m%d-%H%M%S").to_string(),
        };
        info!("Created session {} for dataset {}", session_id, self.dataset_id);
        ChatSession::new(&self.user_id, &self.dataset_id, session_id)
    }

    /// Persist the full session document.
    ///
    /// The blob write is authoritative and must succeed. The mirror upsert is
    /// best-effort: a failure there is logged and does not fail the save.
    /// There is no version check; concurrent saves of the same session are
    /// last-write-wins.
    pub async fn save(&self, session: &ChatSession) -> LogmineResult<()> {
        let key = self.session_key(&session.session_id);
        let body = serde_json::to_string_pretty(session)?;
        self.blob.write(&key, &body).await?;

        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.upsert(session).await {
                warn!("Mirror upsert failed for session {}: {}", session.session_id, e);
            }
        }

        debug!("Saved session {} to {}", session.session_id, key);
        Ok(())
    }

    /// Enumerate all session object keys under this dataset's chat-log prefix
    pub async fn list_session_blobs(&self) -> LogmineResult<Vec<String>> {
        let prefix = format!("{}{}", self.prefix, self.folder);
        self.blob.list(&prefix).await
    }

    /// Compact projection of a session, including store-level addressing,
    /// for external per-dataset indices
    pub fn metadata(&self, session: &ChatSession) -> SessionMetadata {
        SessionMetadata {
            session_id: session.session_id.clone(),
            file: format!("{}{}", self.folder, session.file_name()),
            started_at: session.started_at,
            ended_at: session.last_updated,
            num_turns: session.num_turns(),
            last_updated: session.last_updated,
            summary: session.summary.clone(),
            bucket: self.bucket.clone(),
            folder: self.folder.clone(),
        }
    }

    /// The storage path identifies the session; the document's identity
    /// fields follow the manager's triple on load.
    fn adopt(&self, mut session: ChatSession, session_id: &str) -> ChatSession {
        session.user_id = self.user_id.clone();
        session.dataset_id = self.dataset_id.clone();
        session.session_id = session_id.to_string();
        session
    }
}
