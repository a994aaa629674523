//! Dataset artefact resolution and local caching
//!
//! This module turns a dataset description (remote file descriptors) into a
//! locally mirrored, lazily completed cache and answers "give me a local path
//! for role/name X" cheaply and idempotently.

pub mod fetch;
pub mod gcs;
pub mod resolver;
pub mod types;

pub use fetch::ArtefactFetcher;
pub use gcs::GcsLocation;
pub use resolver::{DatasetArtefacts, DatasetMetadata, DatasetResolver};
pub use types::{DatasetDescription, DatasetFile, FileRegistry};
