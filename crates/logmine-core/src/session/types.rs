//! Chat session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::timefmt;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// End-user question
    User,
    /// Assistant answer
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a session transcript. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: ChatRole,
    /// Message text, trimmed
    pub text: String,
    /// UTC timestamp, second precision
    #[serde(with = "crate::timefmt")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message timestamped now
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into().trim().to_string(),
            timestamp: timefmt::now(),
        }
    }
}

/// An ordered conversation transcript for one (user, dataset, session)
/// triple.
///
/// Message order is conversation order; the transcript is append-only and
/// never reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub session_id: String,
    pub user_id: String,
    pub dataset_id: String,
    /// Timestamp of the first message
    #[serde(with = "crate::timefmt")]
    pub started_at: DateTime<Utc>,
    /// Timestamp of the most recent message
    #[serde(with = "crate::timefmt")]
    pub last_updated: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
    /// Free-text summary of the conversation, empty when not yet generated.
    /// Older documents stored this under `description`.
    #[serde(default, alias = "description")]
    pub summary: String,
}

impl ChatSession {
    /// Create an empty session for the given identity triple
    pub fn new(
        user_id: impl Into<String>,
        dataset_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        let now = timefmt::now();
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            dataset_id: dataset_id.into(),
            started_at: now,
            last_updated: now,
            messages: Vec::new(),
            summary: String::new(),
        }
    }

    /// Append a message to the transcript.
    ///
    /// The first appended message pins `started_at`; every append advances
    /// `last_updated` to the message timestamp.
    pub fn append(&mut self, role: ChatRole, text: impl Into<String>) {
        let message = ChatMessage::new(role, text);
        if self.messages.is_empty() {
            self.started_at = message.timestamp;
        }
        self.last_updated = message.timestamp;
        self.messages.push(message);
    }

    /// Number of conversation turns, i.e. user messages. Always recomputed
    /// from the transcript.
    pub fn num_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == ChatRole::User)
            .count()
    }

    /// Overwrite the free-text summary
    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
    }

    /// File name of this session's blob object
    pub fn file_name(&self) -> String {
        format!("{}.json", self.session_id)
    }
}

/// Compact projection of a session for external per-dataset indices,
/// maintained without re-reading full transcripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub session_id: String,
    /// Blob path relative to the dataset prefix
    pub file: String,
    #[serde(with = "crate::timefmt")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "crate::timefmt")]
    pub ended_at: DateTime<Utc>,
    pub num_turns: usize,
    #[serde(with = "crate::timefmt")]
    pub last_updated: DateTime<Utc>,
    pub summary: String,
    pub bucket: String,
    pub folder: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_tracks_turns_and_timestamps() {
        let mut session = ChatSession::new("user-1", "ds-1", "session-20240305-140702");
        session.append(ChatRole::User, "Hi");
        session.append(ChatRole::Assistant, "Hello");

        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.num_turns(), 1);
        assert_eq!(session.started_at, session.messages[0].timestamp);
        assert_eq!(session.last_updated, session.messages[1].timestamp);
        assert!(session.started_at <= session.last_updated);
    }

    #[test]
    fn test_append_trims_text() {
        let mut session = ChatSession::new("user-1", "ds-1", "s");
        session.append(ChatRole::User, "  what changed?  \n");
        assert_eq!(session.messages[0].text, "what changed?");
    }

    #[test]
    fn test_num_turns_counts_only_user_messages() {
        let mut session = ChatSession::new("user-1", "ds-1", "s");
        for _ in 0..3 {
            session.append(ChatRole::User, "q");
            session.append(ChatRole::Assistant, "a");
        }
        session.append(ChatRole::Assistant, "afterthought");
        assert_eq!(session.num_turns(), 3);
    }

    #[test]
    fn test_wire_format() {
        let mut session = ChatSession::new("user-1", "ds-1", "session-20240305-140702");
        session.append(ChatRole::User, "Hi");

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["sessionId"], "session-20240305-140702");
        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["datasetId"], "ds-1");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["summary"], "");

        let started = json["startedAt"].as_str().unwrap();
        assert!(started.ends_with('Z'));
        assert_eq!(started.len(), "2024-03-05T14:07:02Z".len());
    }

    #[test]
    fn test_serde_round_trip() {
        let mut session = ChatSession::new("user-1", "ds-1", "s");
        session.append(ChatRole::User, "Hi");
        session.append(ChatRole::Assistant, "Hello");
        session.set_summary("greeting");

        let json = serde_json::to_string(&session).unwrap();
        let restored: ChatSession = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.messages, session.messages);
        assert_eq!(restored.started_at, session.started_at);
        assert_eq!(restored.last_updated, session.last_updated);
        assert_eq!(restored.summary, "greeting");
    }

    #[test]
    fn test_summary_accepts_legacy_description_field() {
        let restored: ChatSession = serde_json::from_str(
            r#"{
                "sessionId": "s", "userId": "u", "datasetId": "d",
                "startedAt": "2024-03-05T14:07:02Z",
                "lastUpdated": "2024-03-05T14:08:00Z",
                "messages": [],
                "description": "old style"
            }"#,
        )
        .unwrap();
        assert_eq!(restored.summary, "old style");
    }

    #[test]
    fn test_file_name() {
        let session = ChatSession::new("u", "d", "session-20240305-140702");
        assert_eq!(session.file_name(), "session-20240305-140702.json");
    }

    #[test]
    fn test_role_display() {
        assert_eq!(format!("{}", ChatRole::User), "user");
        assert_eq!(format!("{}", ChatRole::Assistant), "assistant");
    }
}
