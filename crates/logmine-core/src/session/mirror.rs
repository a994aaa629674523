//! Optional document-database mirror for chat sessions
//!
//! The mirror adds query capability and a point-lookup fallback next to the
//! authoritative blob store. It is never required: the session manager holds
//! an `Option` of it and no-ops cleanly when absent.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::types::ChatSession;
use crate::config::MirrorConfig;
use crate::error::{LogmineError, LogmineResult};

/// Queryable mirror storage trait, keyed by the (user, dataset, session)
/// identity triple
#[async_trait]
pub trait SessionMirrorStore: Send + Sync {
    /// Insert or replace the full session document
    async fn upsert(&self, session: &ChatSession) -> LogmineResult<()>;

    /// Point lookup by identity triple
    async fn find(
        &self,
        user_id: &str,
        dataset_id: &str,
        session_id: &str,
    ) -> LogmineResult<Option<ChatSession>>;
}

/// Mirror backed by a document database exposed over an HTTP data API
/// (MongoDB-style `updateOne`/`findOne` actions).
pub struct HttpMirrorStore {
    client: Client,
    config: MirrorConfig,
    timeout_secs: u64,
}

impl HttpMirrorStore {
    /// Create a mirror client from its configuration
    pub fn new(config: MirrorConfig, timeout_secs: u64) -> LogmineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LogmineError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            timeout_secs,
        })
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/action/{}", self.config.endpoint.trim_end_matches('/'), action)
    }

    fn filter_for(user_id: &str, dataset_id: &str, session_id: &str) -> serde_json::Value {
        json!({
            "userId": user_id,
            "datasetId": dataset_id,
            "sessionId": session_id,
        })
    }

    async fn post_action(
        &self,
        action: &str,
        payload: serde_json::Value,
    ) -> LogmineResult<serde_json::Value> {
        let mut request = self.client.post(self.action_url(action)).json(&payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("api-key", api_key);
        }
        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let response = response.error_for_status().map_err(|e| self.map_error(e))?;
        response.json().await.map_err(|e| self.map_error(e))
    }

    fn map_error(&self, error: reqwest::Error) -> LogmineError {
        if error.is_timeout() {
            LogmineError::timeout(self.timeout_secs)
        } else {
            LogmineError::storage(format!("Mirror request failed: {error}"))
        }
    }
}

#[async_trait]
impl SessionMirrorStore for HttpMirrorStore {
    async fn upsert(&self, session: &ChatSession) -> LogmineResult<()> {
        let payload = json!({
            "database": self.config.database,
            "collection": self.config.collection,
            "filter": Self::filter_for(&session.user_id, &session.dataset_id, &session.session_id),
            "update": {
                "$set": serde_json::to_value(session)?,
                "$currentDate": { "updatedAt": true },
            },
            "upsert": true,
        });
        self.post_action("updateOne", payload).await?;
        debug!("Mirrored session {} to document store", session.session_id);
        Ok(())
    }

    async fn find(
        &self,
        user_id: &str,
        dataset_id: &str,
        session_id: &str,
    ) -> LogmineResult<Option<ChatSession>> {
        let payload = json!({
            "database": self.config.database,
            "collection": self.config.collection,
            "filter": Self::filter_for(user_id, dataset_id, session_id),
        });
        let response = self.post_action("findOne", payload).await?;

        match response.get("document") {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(document) => Ok(Some(serde_json::from_value(document.clone())?)),
        }
    }
}

/// In-memory mirror (tests and embedded use)
#[derive(Debug, Default)]
pub struct MemoryMirrorStore {
    sessions: RwLock<HashMap<(String, String, String), ChatSession>>,
}

impl MemoryMirrorStore {
    /// Create an empty in-memory mirror
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionMirrorStore for MemoryMirrorStore {
    async fn upsert(&self, session: &ChatSession) -> LogmineResult<()> {
        let key = (
            session.user_id.clone(),
            session.dataset_id.clone(),
            session.session_id.clone(),
        );
        self.sessions.write().await.insert(key, session.clone());
        Ok(())
    }

    async fn find(
        &self,
        user_id: &str,
        dataset_id: &str,
        session_id: &str,
    ) -> LogmineResult<Option<ChatSession>> {
        let key = (
            user_id.to_string(),
            dataset_id.to_string(),
            session_id.to_string(),
        );
        Ok(self.sessions.read().await.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::ChatRole;

    #[tokio::test]
    async fn test_memory_mirror_upsert_find() {
        let mirror = MemoryMirrorStore::new();
        let mut session = ChatSession::new("user-1", "ds-1", "session-1");
        session.append(ChatRole::User, "Hi");

        mirror.upsert(&session).await.unwrap();
        let found = mirror.find("user-1", "ds-1", "session-1").await.unwrap().unwrap();
        assert_eq!(found.messages.len(), 1);

        assert!(mirror.find("user-2", "ds-1", "session-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_mirror_upsert_replaces() {
        let mirror = MemoryMirrorStore::new();
        let mut session = ChatSession::new("user-1", "ds-1", "session-1");

        mirror.upsert(&session).await.unwrap();
        session.append(ChatRole::User, "Hi");
        mirror.upsert(&session).await.unwrap();

        let found = mirror.find("user-1", "ds-1", "session-1").await.unwrap().unwrap();
        assert_eq!(found.num_turns(), 1);
    }

    #[test]
    fn test_http_mirror_action_url() {
        let store = HttpMirrorStore::new(
            MirrorConfig::new("https://db.example.com/api/v1/"),
            30,
        )
        .unwrap();
        assert_eq!(
            store.action_url("updateOne"),
            "https://db.example.com/api/v1/action/updateOne"
        );
    }
}
