//! Error types for pipeline runs.

use std::path::PathBuf;

use thiserror::Error;

use crate::plugin::PluginError;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A plugin reported a failure; later plugins were not run.
    #[error("plugin '{name}' failed: {source}")]
    Plugin {
        name: String,
        #[source]
        source: PluginError,
    },

    #[error("failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pipeline task failed: {0}")]
    Task(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
