//! The bundle plugin.
//!
//! One invocation walks through these stages:
//!
//! 1. select the file map keys matching the configured pattern
//! 2. resolve bundler settings (external config file under local settings)
//! 3. map every selected file to an entry point
//! 4. create or reconfigure the cached compiler and run it
//! 5. read each bundle back from the in-memory filesystem and splice it
//!    into the file map under its `.js` name
//!
//! The file map is only touched in the last stage, and only once every
//! bundle has been read. A failure anywhere earlier leaves it as it was.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use smithpack_config::{BundleOptions, ConfigResolver, PatternMatcher, ProjectResolver, load_config};
use smithpack_pipeline::{FileMap, Pipeline, Plugin, PluginError};
use tracing::{debug, info, warn};

use crate::bundler::{BundlerConfig, CompilerFactory};
use crate::compiler::CompilerCache;
use crate::entry::{create_entry, destination_path, entry_name};
use crate::error::{Error, Result};
use crate::vfs::{MemoryFs, read_output};

/// Name the plugin reports to the pipeline.
pub const PLUGIN_NAME: &str = "smithpack";

/// A bundle ready to be written into the file map.
struct Splice {
    source: String,
    destination: String,
    contents: String,
}

/// Pipeline plugin that replaces matching files with their bundles.
///
/// Each instance owns one compiler and one output filesystem. Reuse the same
/// instance across builds to keep the compiler warm.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use smithpack::{BundleOptions, BundlePlugin};
/// use smithpack_pipeline::Smith;
///
/// let plugin = BundlePlugin::new(
///     BundleOptions::new()
///         .pattern(vec!["js/*.js", "!js/vendor.js"])
///         .config("bundler.config.json"),
///     Arc::new(MyBundler::default()),
/// )?;
///
/// Smith::new("./site").use_plugin(plugin).build().await?;
/// ```
#[derive(Debug)]
pub struct BundlePlugin {
    options: BundleOptions,
    matcher: PatternMatcher,
    resolver: Arc<dyn ConfigResolver>,
    output_fs: Arc<MemoryFs>,
    compilers: CompilerCache,
}

impl BundlePlugin {
    /// Create a plugin for `options`, bundling with compilers from `factory`.
    ///
    /// The pattern is compiled here, so a malformed glob fails construction
    /// instead of the first build. Reserved settings are dropped.
    pub fn new(options: BundleOptions, factory: Arc<dyn CompilerFactory>) -> Result<Self> {
        let options = options.sanitized();
        let matcher = options.pattern.compile()?;
        let output_fs = Arc::new(MemoryFs::new());
        let compilers = CompilerCache::new(factory, Arc::clone(&output_fs));

        Ok(Self {
            options,
            matcher,
            resolver: Arc::new(ProjectResolver),
            output_fs,
            compilers,
        })
    }

    /// Use a different resolver for the external config file.
    pub fn with_resolver(mut self, resolver: Arc<dyn ConfigResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn options(&self) -> &BundleOptions {
        &self.options
    }

    /// The filesystem the compiler writes into.
    pub fn output_fs(&self) -> &Arc<MemoryFs> {
        &self.output_fs
    }

    pub fn compilers(&self) -> &CompilerCache {
        &self.compilers
    }

    /// File map keys this plugin would bundle, in file map order.
    pub fn select(&self, files: &FileMap) -> Vec<String> {
        self.matcher.select(files.keys())
    }

    /// Bundle the matching files in `files`.
    #[tracing::instrument(skip_all, fields(pattern = %self.options.pattern))]
    pub async fn bundle(&self, files: &mut FileMap, pipeline: &dyn Pipeline) -> Result<()> {
        let started = Instant::now();

        let selected = self.select(files);
        if selected.is_empty() {
            return Err(Error::PatternNoMatch {
                pattern: self.options.pattern.to_string(),
            });
        }
        debug!(files = selected.len(), "selected files");

        let settings = load_config(
            self.options.config.as_deref(),
            pipeline.directory(),
            self.options.settings.clone(),
            self.resolver.as_ref(),
        )?;
        let entry = create_entry(&selected[..], &pipeline.source());
        let config = BundlerConfig::new(settings, entry);
        let output = config.output.clone();

        let mut compiler = self.compilers.get_compiler(config).await?;

        if self.options.clean_output {
            let removed = self.output_fs.clear();
            if removed > 0 {
                debug!(removed, "cleared previous output");
            }
        }

        let stats = compiler.run().await?;
        if stats.has_errors() {
            return Err(Error::Compilation {
                messages: stats.errors().to_vec(),
            });
        }
        for message in stats.warnings() {
            warn!(warning = %message, "bundler warning");
        }

        let splices = self.stage(&selected, |name| output.file_for(name)).await?;
        drop(compiler);

        let bundled = splices.len();
        apply(files, splices);

        info!(
            files = bundled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "bundled"
        );
        Ok(())
    }

    /// Read every bundle back before anything in the file map changes.
    async fn stage(
        &self,
        selected: &[String],
        output_file: impl Fn(&str) -> PathBuf,
    ) -> Result<Vec<Splice>> {
        let mut splices = Vec::with_capacity(selected.len());

        for file in selected {
            let path = output_file(entry_name(file));
            let contents = read_output(&self.output_fs, &path).await?;
            splices.push(Splice {
                source: file.clone(),
                destination: destination_path(file),
                contents,
            });
        }
        Ok(splices)
    }
}

/// Replace each source with its bundle, keeping its metadata.
fn apply(files: &mut FileMap, splices: Vec<Splice>) {
    for Splice {
        source,
        destination,
        contents,
    } in splices
    {
        let Some(mut record) = files.get(&source).cloned() else {
            continue;
        };
        record.contents = contents.into_bytes();

        if destination != source {
            files.shift_remove(&source);
            debug!(from = %source, to = %destination, "renamed bundle");
        }
        files.insert(destination, record);
    }
}

#[async_trait]
impl Plugin for BundlePlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    async fn run(
        &self,
        files: &mut FileMap,
        pipeline: &dyn Pipeline,
    ) -> std::result::Result<(), PluginError> {
        self.bundle(files, pipeline).await.map_err(Into::into)
    }
}
