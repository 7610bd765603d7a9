//! In-memory output filesystem and the bridge that reads bundles back out.
//!
//! The compiler writes into a [`MemoryFs`] instead of the disk. Paths are
//! rooted at `/`: relative paths are resolved against it and every path is
//! normalized before storage, so `/a/./b.js` and `a/b.js` name the same file.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

/// Errors from the in-memory filesystem.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

/// Byte store shared between the compiler and the plugin.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RwLock<FxHashMap<PathBuf, Vec<u8>>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.clean()
        } else {
            Path::new("/").join(path).clean()
        }
    }

    /// Create or overwrite a file.
    pub fn write_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let normalized = Self::normalize(path.as_ref());
        self.files.write().insert(normalized, contents.into());
    }

    pub async fn read_file(&self, path: &Path) -> std::result::Result<Vec<u8>, VfsError> {
        let normalized = Self::normalize(path);
        self.files
            .read()
            .get(&normalized)
            .cloned()
            .ok_or(VfsError::FileNotFound(normalized))
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(&Self::normalize(path))
    }

    pub fn remove_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.write().remove(&Self::normalize(path))
    }

    /// Remove every file, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut files = self.files.write();
        let removed = files.len();
        files.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.read().keys().cloned().collect();
        paths.sort();
        paths
    }
}

/// Read a bundle the compiler wrote, decoded as UTF-8 text.
///
/// A missing file means the bundler did not produce the expected output name.
pub async fn read_output(fs: &MemoryFs, path: &Path) -> Result<String> {
    let bytes = fs
        .read_file(path)
        .await
        .map_err(|_| Error::OutputMismatch {
            path: path.to_path_buf(),
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
