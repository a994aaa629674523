//! Logmine Core Library
//!
//! This crate provides the core functionality shared by the logmine
//! conversational analytics assistant: dataset artefact resolution and
//! local caching, request-scoped context propagation for analysis tools,
//! and dual-backend chat session persistence.

pub mod config;
pub mod context;
pub mod dataset;
pub mod error;
pub mod session;
pub mod timefmt;

// Re-export commonly used types
pub use config::{CoreConfig, MirrorConfig};
pub use context::RequestContext;
pub use dataset::{DatasetArtefacts, DatasetDescription, DatasetFile, DatasetResolver};
pub use error::{LogmineError, LogmineResult};
pub use session::{
    ChatHistoryManager, ChatMessage, ChatRole, ChatSession, FsBlobStore, GcsBlobStore,
    HttpMirrorStore, MemoryMirrorStore, SessionBlobStore, SessionMetadata, SessionMirrorStore,
};
