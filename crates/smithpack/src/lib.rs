#![cfg_attr(docsrs, feature(doc_cfg))]

//! # smithpack
//!
//! A pipeline plugin that replaces script files with their bundles.
//!
//! On every build the plugin selects files from the pipeline's file map with
//! a glob pattern, turns each into a bundler entry point, runs a cached
//! bundler compiler whose output goes to an in-memory filesystem, and writes
//! each bundle back into the file map as `<dir>/<name>.js`.
//!
//! The bundler is pluggable: implement [`CompilerFactory`] and [`Compiler`]
//! for it and hand the factory to [`BundlePlugin::new`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use smithpack::{BundleOptions, BundlePlugin, Smith};
//!
//! # async fn build(bundler: Arc<dyn smithpack::CompilerFactory>) -> Result<(), Box<dyn std::error::Error>> {
//! let plugin = BundlePlugin::new(
//!     BundleOptions::new()
//!         .pattern("entry-{1,2}.js")
//!         .config("bundler.config.json")
//!         .setting("mode", "development"),
//!     bundler,
//! )?;
//!
//! let files = Smith::new("./site").use_plugin(plugin).build().await?;
//! # Ok(()) }
//! ```
//!
//! ## Configuration
//!
//! Settings from the file named by `config` are loaded relative to the
//! pipeline's project directory and merged under the plugin's own settings:
//! a key set in both places takes the plugin's value wholesale. `entry` and
//! `output` are always computed by the plugin.

pub mod bundler;
pub mod compiler;
pub mod entry;
pub mod error;
pub mod plugin;
pub mod vfs;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

pub use bundler::{
    BundlerConfig, BundlerError, Compiler, CompilerFactory, NAME_PLACEHOLDER, OptionsDefaulter,
    OptionsNormalizer, OutputOptions, Stats,
};
pub use compiler::{CompilerCache, CompilerGuard, CompilerHandle};
pub use entry::{EntryMap, create_entry, destination_path, entry_name};
pub use error::{Error, Result};
pub use plugin::{BundlePlugin, PLUGIN_NAME};
pub use vfs::{MemoryFs, VfsError, read_output};

pub use smithpack_config::{BundleOptions, ConfigError, ConfigResolver, Pattern, ProjectResolver};
pub use smithpack_pipeline::{FileMap, FileRecord, Pipeline, PipelineError, Plugin, Smith};
