//! In-memory file records passed between pipeline plugins.

use std::borrow::Cow;
use std::path::{Component, Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Files keyed by their `/`-separated path relative to the source directory.
///
/// Insertion order is preserved so plugins see files in the order the
/// source tree was read, and renamed files are appended at the end.
pub type FileMap = IndexMap<String, FileRecord>;

/// A single file: its bytes plus whatever metadata earlier plugins attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub contents: Vec<u8>,

    /// Arbitrary plugin metadata (front matter, permalinks, ...).
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl FileRecord {
    pub fn new(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: contents.into(),
            metadata: Map::new(),
        }
    }

    /// Attach a metadata value, replacing any previous value under `key`.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Contents decoded as UTF-8, replacing invalid sequences.
    pub fn contents_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.contents)
    }
}

/// Convert a path relative to the source directory into a file map key.
///
/// Returns `None` for paths that escape the source directory or are not
/// valid UTF-8.
pub fn file_key(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}
