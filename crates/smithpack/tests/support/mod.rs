//! A small text bundler for exercising the plugin end to end.
//!
//! Each entry is read from disk. Lines of the form `//@include <path>` are
//! replaced by the file they name (relative to the entry), and every key of
//! the `define` setting is substituted with its value. Unreadable files are
//! reported through `Stats`, the way a real bundler reports a missing module.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use smithpack::{
    BundlerConfig, BundlerError, Compiler, CompilerFactory, MemoryFs, OptionsDefaulter,
    OptionsNormalizer, Smith, Stats,
};
use tempfile::TempDir;

const INCLUDE: &str = "//@include ";

/// Shared counters and switches, visible to the test after the plugin took
/// ownership of the factory.
#[derive(Debug, Clone, Default)]
pub struct StubBundler {
    pub created: Arc<AtomicUsize>,
    pub runs: Arc<AtomicUsize>,
    crash: Arc<AtomicBool>,
    skipped: Arc<Mutex<Vec<String>>>,
    last_options: Arc<Mutex<Option<BundlerConfig>>>,
}

impl StubBundler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Make every following run fail outright.
    pub fn crash(&self, crash: bool) {
        self.crash.store(crash, Ordering::SeqCst);
    }

    /// Stop emitting output for entry `name`.
    pub fn skip_entry(&self, name: &str) {
        self.skipped.lock().push(name.to_string());
    }

    pub fn clear_skipped(&self) {
        self.skipped.lock().clear();
    }

    /// Options the most recent run used.
    pub fn last_options(&self) -> Option<BundlerConfig> {
        self.last_options.lock().clone()
    }
}

impl CompilerFactory for StubBundler {
    fn create(&self, config: BundlerConfig) -> Result<Box<dyn Compiler>, BundlerError> {
        if let Some(Value::String(mode)) = config.setting("mode") {
            if !matches!(mode.as_str(), "development" | "production" | "none") {
                return Err(BundlerError::InvalidConfig(format!("unknown mode '{mode}'")));
            }
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubCompiler {
            options: config,
            output: None,
            shared: self.clone(),
        }))
    }

    fn options_normalizer(&self) -> Box<dyn OptionsNormalizer> {
        Box::new(OptionsDefaulter::new().with_default("mode", "production"))
    }
}

#[derive(Debug)]
pub struct StubCompiler {
    options: BundlerConfig,
    output: Option<Arc<MemoryFs>>,
    shared: StubBundler,
}

#[async_trait]
impl Compiler for StubCompiler {
    fn options(&self) -> &BundlerConfig {
        &self.options
    }

    fn set_options(&mut self, options: BundlerConfig) {
        self.options = options;
    }

    fn set_output_file_system(&mut self, fs: Arc<MemoryFs>) {
        self.output = Some(fs);
    }

    async fn run(&mut self) -> Result<Stats, BundlerError> {
        self.shared.runs.fetch_add(1, Ordering::SeqCst);
        *self.shared.last_options.lock() = Some(self.options.clone());

        if self.shared.crash.load(Ordering::SeqCst) {
            return Err(BundlerError::Other("bundler process exited unexpectedly".into()));
        }
        let fs = self
            .output
            .clone()
            .ok_or_else(|| BundlerError::Other("no output file system".into()))?;

        let mut stats = Stats::new();
        if self.options.setting("mode").is_none() {
            stats.push_warning("The 'mode' option has not been set");
        }

        let empty = Map::new();
        let define = self
            .options
            .setting("define")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let skipped = self.shared.skipped.lock().clone();

        for (name, path) in &self.options.entry {
            if skipped.contains(name) {
                continue;
            }
            match bundle_entry(path, define).await {
                Ok(bundle) => fs.write_file(self.options.output.file_for(name), bundle),
                Err(message) => stats.push_error(message),
            }
        }
        Ok(stats)
    }
}

async fn bundle_entry(path: &Path, define: &Map<String, Value>) -> Result<String, String> {
    let source = read_module(path).await?;
    let dir = path.parent().unwrap_or(Path::new("/"));

    let mut out = String::new();
    for line in source.lines() {
        match line.trim().strip_prefix(INCLUDE) {
            Some(include) => out.push_str(&read_module(&dir.join(include)).await?),
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    for (key, value) in define {
        let replacement = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out = out.replace(key.as_str(), &replacement);
    }
    Ok(out)
}

async fn read_module(path: &Path) -> Result<String, String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|_| format!("Module not found: Can't resolve '{}'", path.display()))
}

/// A project directory with `files` written below it (paths relative to the
/// project root, so sources go under `src/`).
pub fn create_site(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    for (path, contents) in files {
        write(dir.path(), path, contents);
    }
    dir
}

pub fn write(root: &Path, path: &str, contents: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(full, contents).expect("write file");
}

/// A pipeline over `site` with the usual `src`/`build` layout.
pub fn smith(site: &TempDir) -> Smith {
    Smith::new(site.path()).with_source("src").with_destination("build")
}

/// The example project: two entries sharing an include, plus a stylesheet.
pub fn example_site() -> TempDir {
    create_site(&[
        (
            "src/entry-1.js",
            "//@include lib/other-1.js\nprint(config_variable);\n",
        ),
        ("src/entry-2.js", "//@include lib/other-2.js\n"),
        ("src/lib/other-1.js", "print(\"other 1\");\n"),
        ("src/lib/other-2.js", "print(\"other 2\");\n"),
        ("src/style.css", "body { margin: 0 }\n"),
        (
            "bundler.config.json",
            r#"{
  "mode": "development",
  "define": { "config_variable": "'ooooh.'" }
}"#,
        ),
    ])
}
