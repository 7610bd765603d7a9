//! Minimal in-process pipeline host.
//!
//! `Smith` reads every file under the source directory into a [`FileMap`],
//! hands the map to each registered plugin in turn and finally writes the
//! map out under the destination directory. Disk access runs on tokio's
//! blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use path_clean::PathClean;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{PipelineError, Result};
use crate::file::{FileMap, FileRecord, file_key};
use crate::plugin::{Pipeline, Plugin};

/// A pipeline rooted at a project directory.
pub struct Smith {
    directory: PathBuf,
    source: PathBuf,
    destination: PathBuf,
    clean: bool,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl Smith {
    /// Create a pipeline for the given project directory.
    ///
    /// Defaults: source `src`, destination `build`, no cleaning.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let directory = std::path::absolute(&directory)
            .unwrap_or(directory)
            .clean();
        Self {
            directory,
            source: PathBuf::from("src"),
            destination: PathBuf::from("build"),
            clean: false,
            plugins: Vec::new(),
        }
    }

    /// Source directory, relative to the project directory unless absolute.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }

    /// Destination directory, relative to the project directory unless absolute.
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Remove the destination directory before writing.
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Register a plugin. Plugins run in registration order.
    pub fn use_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Register an already shared plugin, keeping its state across pipelines.
    pub fn use_shared(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn destination(&self) -> PathBuf {
        self.resolve(&self.destination)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.clean()
        } else {
            self.directory.join(path).clean()
        }
    }

    /// Read the source tree into a file map, ordered by path.
    pub async fn read(&self) -> Result<FileMap> {
        let source = Pipeline::source(self);
        tokio::task::spawn_blocking(move || read_tree(&source))
            .await
            .map_err(|e| PipelineError::Task(format!("Task join error: {}", e)))?
    }

    /// Run every plugin over `files`, stopping at the first failure.
    pub async fn run(&self, mut files: FileMap) -> Result<FileMap> {
        for plugin in &self.plugins {
            let started = Instant::now();
            debug!(plugin = plugin.name(), files = files.len(), "running plugin");

            plugin
                .run(&mut files, self)
                .await
                .map_err(|source| PipelineError::Plugin {
                    name: plugin.name().to_string(),
                    source,
                })?;

            debug!(
                plugin = plugin.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "plugin finished"
            );
        }
        Ok(files)
    }

    /// Read the source tree and run the plugins without writing anything.
    pub async fn process(&self) -> Result<FileMap> {
        let files = self.read().await?;
        self.run(files).await
    }

    /// Write `files` below the destination directory.
    pub async fn write(&self, files: &FileMap) -> Result<()> {
        let destination = self.destination();
        let clean = self.clean;
        let files = files.clone();
        tokio::task::spawn_blocking(move || write_tree(&destination, &files, clean))
            .await
            .map_err(|e| PipelineError::Task(format!("Task join error: {}", e)))?
    }

    /// Read, run plugins and write the destination.
    pub async fn build(&self) -> Result<FileMap> {
        let files = self.process().await?;
        self.write(&files).await?;
        info!(
            files = files.len(),
            destination = %self.destination().display(),
            "build complete"
        );
        Ok(files)
    }
}

impl Pipeline for Smith {
    fn directory(&self) -> &Path {
        &self.directory
    }

    fn source(&self) -> PathBuf {
        self.resolve(&self.source)
    }
}

fn read_tree(source: &Path) -> Result<FileMap> {
    let mut files = FileMap::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(key) = entry
            .path()
            .strip_prefix(source)
            .ok()
            .and_then(file_key)
        else {
            debug!(path = %entry.path().display(), "skipping file without a UTF-8 key");
            continue;
        };

        let contents =
            std::fs::read(entry.path()).map_err(|e| PipelineError::io(entry.path(), e))?;
        files.insert(key, FileRecord::new(contents));
    }
    Ok(files)
}

fn write_tree(destination: &Path, files: &FileMap, clean: bool) -> Result<()> {
    if clean && destination.exists() {
        std::fs::remove_dir_all(destination).map_err(|e| PipelineError::io(destination, e))?;
    }

    for (key, record) in files {
        let target = destination.join(key);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        std::fs::write(&target, &record.contents).map_err(|e| PipelineError::io(&target, e))?;
    }
    Ok(())
}
