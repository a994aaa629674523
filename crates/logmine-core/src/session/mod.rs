//! Chat session types and dual-backend persistence
//!
//! A session is an append-only transcript of role-tagged messages for one
//! (user, dataset, session) triple. The authoritative copy lives in a blob
//! store at a deterministic path; an optional document-database mirror adds
//! queryability and a fallback read path.

pub mod manager;
pub mod mirror;
pub mod storage;
pub mod types;

pub use manager::ChatHistoryManager;
pub use mirror::{HttpMirrorStore, MemoryMirrorStore, SessionMirrorStore};
pub use storage::{FsBlobStore, GcsBlobStore, SessionBlobStore};
pub use types::{ChatMessage, ChatRole, ChatSession, SessionMetadata};
