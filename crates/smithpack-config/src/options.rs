//! Options the bundle plugin is constructed with.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ConfigError, Result};
use crate::pattern::Pattern;

/// Selects every JavaScript file in the source tree.
pub const DEFAULT_PATTERN: &str = "**/*.js";

/// Bundler settings the plugin always computes itself.
pub const RESERVED_KEYS: [&str; 2] = ["entry", "output"];

/// Plugin options.
///
/// Any field other than `pattern`, `config` and `clean_output` is passed to
/// the bundler untouched through `settings`.
///
/// # Example
///
/// ```
/// use smithpack_config::BundleOptions;
/// use serde_json::json;
///
/// let options = BundleOptions::from_value(json!({
///     "pattern": "entry-{1,2}.js",
///     "config": "bundler.config.json",
///     "mode": "development"
/// }))
/// .unwrap();
///
/// assert_eq!(options.settings["mode"], json!("development"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleOptions {
    pub pattern: Pattern,

    /// External bundler config file, relative to the project directory.
    pub config: Option<PathBuf>,

    /// Clear the in-memory output filesystem before each bundler run.
    ///
    /// With this off, output left over from an earlier run can be read back
    /// when the bundler fails to emit a file.
    pub clean_output: bool,

    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            pattern: Pattern::default(),
            config: None,
            clean_output: true,
            settings: Map::new(),
        }
    }
}

impl BundleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON value (e.g. a pipeline's plugin table).
    pub fn from_value(value: Value) -> Result<Self> {
        let options: BundleOptions = serde_json::from_value(value)
            .map_err(|e| ConfigError::invalid_value("options", e))?;
        Ok(options.sanitized())
    }

    pub fn pattern(mut self, pattern: impl Into<Pattern>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = Some(path.into());
        self
    }

    pub fn clean_output(mut self, clean: bool) -> Self {
        self.clean_output = clean;
        self
    }

    /// Set a bundler setting. Reserved keys are dropped with a warning.
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self.sanitized()
    }

    /// Drop reserved keys from `settings`.
    pub fn sanitized(mut self) -> Self {
        for key in RESERVED_KEYS {
            if self.settings.remove(key).is_some() {
                warn!(option = key, "ignoring bundler option; it is computed by the plugin");
            }
        }
        self
    }
}
