//! Bundler abstraction.
//!
//! smithpack does not bundle anything itself. It drives a bundler through
//! the traits in this module: a [`CompilerFactory`] builds a [`Compiler`]
//! from a [`BundlerConfig`], the compiler writes its output into a
//! [`MemoryFs`] and reports a [`Stats`] summary, and an [`OptionsNormalizer`]
//! turns raw configs into the form a live compiler accepts on reconfiguration.
//!
//! # Example
//!
//! ```rust,ignore
//! use smithpack::bundler::{BundlerConfig, BundlerError, Compiler, CompilerFactory, Stats};
//!
//! #[derive(Debug)]
//! struct MyBundler;
//!
//! impl CompilerFactory for MyBundler {
//!     fn create(&self, config: BundlerConfig) -> Result<Box<dyn Compiler>, BundlerError> {
//!         Ok(Box::new(MyCompiler::new(config)))
//!     }
//! }
//! ```

use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entry::EntryMap;
use crate::vfs::MemoryFs;

/// Placeholder in [`OutputOptions::filename`] replaced by the entry name.
pub const NAME_PLACEHOLDER: &str = "[name]";

/// Transport-level bundler failures.
///
/// Problems inside the bundled sources are not errors at this level; they are
/// reported through [`Stats::errors`].
#[derive(Debug, thiserror::Error)]
pub enum BundlerError {
    /// The bundler rejected its configuration
    #[error("invalid bundler configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other bundler error
    #[error("{0}")]
    Other(String),
}

/// Where and under which names the bundler writes its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    pub path: PathBuf,
    pub filename: String,
}

impl OutputOptions {
    /// `/[name].js` inside the in-memory filesystem.
    pub fn memory() -> Self {
        Self {
            path: PathBuf::from("/"),
            filename: format!("{NAME_PLACEHOLDER}.js"),
        }
    }

    /// Path the bundler writes the bundle for entry `name` to.
    pub fn file_for(&self, name: &str) -> PathBuf {
        self.path.join(self.filename.replace(NAME_PLACEHOLDER, name))
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self::memory()
    }
}

/// Complete configuration handed to the bundler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundlerConfig {
    /// Free-form bundler settings (mode, plugins, devtool, ...).
    #[serde(flatten)]
    pub settings: Map<String, Value>,
    pub entry: EntryMap,
    pub output: OutputOptions,
}

impl BundlerConfig {
    /// Config writing every entry to the in-memory filesystem root.
    pub fn new(settings: Map<String, Value>, entry: EntryMap) -> Self {
        Self {
            settings,
            entry,
            output: OutputOptions::memory(),
        }
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}

/// Outcome of a compiler run that reached the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// A live bundler instance.
///
/// Compilers are long-lived: they are created once and reconfigured through
/// [`Compiler::set_options`] between runs, which lets a bundler keep its
/// module caches warm.
#[async_trait]
pub trait Compiler: Send + Sync + Debug {
    /// Options the next run will use.
    fn options(&self) -> &BundlerConfig;

    /// Replace the active options with an already normalized config.
    fn set_options(&mut self, options: BundlerConfig);

    /// Route all output into `fs` instead of the real filesystem.
    fn set_output_file_system(&mut self, fs: Arc<MemoryFs>);

    /// Bundle every entry in the active options.
    ///
    /// `Err` means the run itself failed; source-level problems come back as
    /// `Ok` with [`Stats::has_errors`] set.
    async fn run(&mut self) -> Result<Stats, BundlerError>;
}

/// Builds compilers for one bundler implementation.
pub trait CompilerFactory: Send + Sync + Debug {
    fn create(&self, config: BundlerConfig) -> Result<Box<dyn Compiler>, BundlerError>;

    /// Normalizer used when an existing compiler is reconfigured.
    ///
    /// Called once per [`CompilerCache`](crate::compiler::CompilerCache); the
    /// returned value is reused for every later run.
    fn options_normalizer(&self) -> Box<dyn OptionsNormalizer> {
        Box::new(OptionsDefaulter::new())
    }
}

/// Turns a raw config into the normalized form a compiler accepts.
pub trait OptionsNormalizer: Send + Sync + Debug {
    fn process(&self, config: BundlerConfig) -> BundlerConfig;
}

/// Fills settings the config leaves out from a table of defaults.
#[derive(Debug, Clone, Default)]
pub struct OptionsDefaulter {
    defaults: Map<String, Value>,
}

impl OptionsDefaulter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }
}

impl OptionsNormalizer for OptionsDefaulter {
    fn process(&self, mut config: BundlerConfig) -> BundlerConfig {
        for (key, value) in &self.defaults {
            config
                .settings
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        config
    }
}
