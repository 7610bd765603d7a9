//! Mapping pipeline files to bundler entry points.
//!
//! - entry name is like: `abc`
//! - entry path is like: `/.../src/js/abc.js`

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use path_clean::PathClean;
use tracing::warn;

/// Entry name → absolute source path, in selection order.
pub type EntryMap = IndexMap<String, PathBuf>;

/// The pieces of a `/`-separated file map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileParts<'a> {
    /// Directory part, empty for files at the source root
    pub dir: &'a str,
    /// File name with extension
    pub base: &'a str,
    /// File name without its last extension
    pub name: &'a str,
}

impl<'a> FileParts<'a> {
    pub fn parse(path: &'a str) -> Self {
        let (dir, base) = match path.rfind('/') {
            Some(idx) => (&path[..idx], &path[idx + 1..]),
            None => ("", path),
        };
        // A leading dot starts a hidden file name, not an extension.
        let name = match base.rfind('.') {
            Some(idx) if idx > 0 => &base[..idx],
            _ => base,
        };
        Self { dir, base, name }
    }
}

/// Build the entry set for a bundler run.
///
/// Each file is keyed by its name without extension. Two files with the same
/// name in different directories collide; the later one wins.
pub fn create_entry<S: AsRef<str>>(files: &[S], root_dir: &Path) -> EntryMap {
    let mut entry = EntryMap::with_capacity(files.len());

    for file in files {
        let FileParts { dir, base, name } = FileParts::parse(file.as_ref());
        let path = resolve(root_dir, dir, base);

        if let Some(previous) = entry.insert(name.to_string(), path) {
            warn!(
                entry = name,
                replaced = %previous.display(),
                "entry name collision; the later file wins"
            );
        }
    }
    entry
}

/// Entry name for a file map key.
pub fn entry_name(file: &str) -> &str {
    FileParts::parse(file).name
}

/// File map key the bundle for `file` is stored under: same directory, `.js`.
pub fn destination_path(file: &str) -> String {
    let FileParts { dir, name, .. } = FileParts::parse(file);
    if dir.is_empty() {
        format!("{name}.js")
    } else {
        format!("{dir}/{name}.js")
    }
}

fn resolve(root_dir: &Path, dir: &str, base: &str) -> PathBuf {
    let joined = root_dir.join(dir).join(base);
    std::path::absolute(&joined).unwrap_or(joined).clean()
}
