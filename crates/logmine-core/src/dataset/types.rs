//! Dataset description wire types and the role/name file registry

use serde::Deserialize;
use std::collections::HashMap;

/// Logical role of the analysis store document
pub const ROLE_STORE: &str = "store";
/// Logical role of the analysis report document
pub const ROLE_REPORT: &str = "report";
/// Logical role of the cleaned event log
pub const ROLE_LOG_CLEANED: &str = "log_cleaned";
/// Logical role of the raw event log
pub const ROLE_LOG_RAW: &str = "log_raw";

/// One remote dataset artefact. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFile {
    /// Logical type, e.g. `"store"`, `"report"`, `"log_cleaned"`, or a
    /// synthesized `generated:<ext>` role for locally produced files
    pub role: String,
    /// Logical/display name
    pub name: String,
    /// Remote location (provider-scheme or HTTP URI)
    pub url: String,
}

impl DatasetFile {
    /// Create a new dataset file descriptor
    pub fn new(role: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
            url: url.into(),
        }
    }

    /// Base name of the file, i.e. the last path segment of `name`
    pub fn basename(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// One file descriptor as it appears in a dataset description. Entries with
/// missing fields are tolerated on the wire and skipped during registry
/// construction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFileEntry {
    #[serde(rename = "type", default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Chat-log placement hint carried by some dataset descriptions
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLogsHint {
    #[serde(default)]
    pub folder: Option<String>,
}

/// Nested folder block; older descriptions wrap the file list in it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFolder {
    #[serde(default)]
    pub files: Vec<DatasetFileEntry>,
    #[serde(default)]
    pub chat_logs: Option<ChatLogsHint>,
}

/// Input to the resolver: the set of remote file descriptors for one dataset.
///
/// The file list may live either at the top level or nested under `folder`;
/// the `chatLogs.folder` hint may appear at either level, the nested one
/// taking precedence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDescription {
    #[serde(default)]
    pub files: Vec<DatasetFileEntry>,
    #[serde(default)]
    pub chat_logs: Option<ChatLogsHint>,
    #[serde(default)]
    pub folder: Option<DatasetFolder>,
}

impl DatasetDescription {
    /// The effective file list, preferring the nested `folder` block when it
    /// carries any entries
    pub fn file_entries(&self) -> &[DatasetFileEntry] {
        match &self.folder {
            Some(folder) if !folder.files.is_empty() => &folder.files,
            _ => &self.files,
        }
    }

    /// The effective chat-log folder hint, if any
    pub fn chat_logs_hint(&self) -> Option<&str> {
        self.folder
            .as_ref()
            .and_then(|f| f.chat_logs.as_ref())
            .or(self.chat_logs.as_ref())
            .and_then(|hint| hint.folder.as_deref())
    }
}

/// Parallel role/name indices over a dataset's files, built once at
/// resolution time.
///
/// A role is unique within one registry. A name key may point at the same
/// physical file twice: every file is indexed under both its full name and
/// its base name.
#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    pub by_role: HashMap<String, DatasetFile>,
    pub by_name: HashMap<String, DatasetFile>,
}

impl FileRegistry {
    /// Build the indices from wire entries, skipping incomplete descriptors
    pub fn from_entries(entries: &[DatasetFileEntry]) -> Self {
        let mut registry = Self::default();
        for entry in entries {
            let (Some(role), Some(name), Some(url)) = (
                entry.file_type.as_deref(),
                entry.name.as_deref(),
                entry.url.as_deref(),
            ) else {
                continue;
            };
            if role.is_empty() || name.is_empty() || url.is_empty() {
                continue;
            }
            let file = DatasetFile::new(role, name, url);
            registry.by_name.insert(file.basename().to_string(), file.clone());
            registry.by_name.insert(name.to_string(), file.clone());
            registry.by_role.insert(role.to_string(), file);
        }
        registry
    }

    /// Look up by logical role
    pub fn get_by_role(&self, role: &str) -> Option<&DatasetFile> {
        self.by_role.get(role)
    }

    /// Look up by literal name (full or base)
    pub fn get_by_name(&self, name: &str) -> Option<&DatasetFile> {
        self.by_name.get(name)
    }

    /// Whether the registry holds no files at all
    pub fn is_empty(&self) -> bool {
        self.by_role.is_empty() && self.by_name.is_empty()
    }
}
