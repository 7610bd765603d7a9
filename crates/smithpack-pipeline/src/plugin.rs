//! Plugin contract between the pipeline host and its build steps.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::file::FileMap;

/// Error returned by a plugin. The host only reports it, so any error type works.
pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

/// What a plugin can ask of the pipeline that invoked it.
pub trait Pipeline: Send + Sync {
    /// Project root directory. Relative configuration paths resolve against it.
    fn directory(&self) -> &Path;

    /// Absolute source directory; file map keys are relative to it.
    fn source(&self) -> PathBuf;
}

/// A single build step.
///
/// The host calls [`Plugin::run`] once per build with the current file set and
/// awaits it before starting the next plugin. Returning `Err` aborts the build;
/// whatever the plugin already changed in `files` stays changed.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    async fn run(&self, files: &mut FileMap, pipeline: &dyn Pipeline) -> Result<(), PluginError>;
}
