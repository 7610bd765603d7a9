//! Loading an external bundler config file and merging it with plugin settings.
//!
//! Config paths are resolved against the host project's directory, never
//! against this crate's location, so a project can keep its bundler config
//! next to its own sources.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Format, Json, Toml, Yaml};
use path_clean::PathClean;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Extensions tried, in order, for a config path given without one.
const CONFIG_EXTENSIONS: [&str; 4] = ["json", "toml", "yaml", "yml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        match extension.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(ConfigError::UnsupportedFormat(if other.is_empty() {
                path.display().to_string()
            } else {
                other.to_string()
            })),
        }
    }
}

/// Finds and parses bundler config files on behalf of a project.
pub trait ConfigResolver: Send + Sync + Debug {
    /// Resolve `specifier` to an existing file, relative to `root`.
    fn resolve(&self, specifier: &Path, root: &Path) -> Result<PathBuf>;

    /// Parse a resolved config file into a settings object.
    ///
    /// Keys come back sorted: figment keeps dictionaries in a `BTreeMap`.
    fn load(&self, path: &Path) -> Result<Map<String, Value>> {
        let figment = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => Figment::from(Json::file_exact(path)),
            ConfigFormat::Toml => Figment::from(Toml::file_exact(path)),
            ConfigFormat::Yaml => Figment::from(Yaml::file_exact(path)),
        };

        figment
            .extract::<Map<String, Value>>()
            .map_err(|e| ConfigError::invalid_value(path.display().to_string(), e))
    }
}

/// Resolves config files inside the project directory.
///
/// Relative specifiers are joined onto the project root; a specifier without
/// an extension is tried with `.json`, `.toml`, `.yaml` and `.yml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectResolver;

impl ConfigResolver for ProjectResolver {
    fn resolve(&self, specifier: &Path, root: &Path) -> Result<PathBuf> {
        let base = if specifier.is_absolute() {
            specifier.clean()
        } else {
            root.join(specifier).clean()
        };

        if base.extension().is_some() {
            return if base.is_file() {
                Ok(base)
            } else {
                Err(ConfigError::NotFound(base))
            };
        }

        for extension in CONFIG_EXTENSIONS {
            let candidate = base.with_extension(extension);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(ConfigError::NotFound(base))
    }
}

/// Resolve the bundler settings for one plugin invocation.
///
/// Without `config_path` the local settings are returned as they are.
/// Otherwise the file is resolved against `root`, parsed, and the local
/// settings are laid over it key by key.
pub fn load_config(
    config_path: Option<&Path>,
    root: &Path,
    local: Map<String, Value>,
    resolver: &dyn ConfigResolver,
) -> Result<Map<String, Value>> {
    let Some(config_path) = config_path else {
        return Ok(local);
    };

    let resolved = resolver.resolve(config_path, root)?;
    let loaded = resolver.load(&resolved)?;
    debug!(
        path = %resolved.display(),
        keys = loaded.len(),
        "loaded bundler config"
    );

    Ok(merge_settings(loaded, local))
}

/// Shallow merge: every key in `local` replaces the same key in `base` wholesale.
pub fn merge_settings(mut base: Map<String, Value>, local: Map<String, Value>) -> Map<String, Value> {
    base.extend(local);
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn merge_is_shallow() {
        let base = map(json!({
            "mode": "development",
            "plugins": [{"name": "define"}, {"name": "env"}],
            "resolve": {"extensions": [".js"], "alias": {"@": "src"}}
        }));
        let local = map(json!({
            "plugins": [],
            "resolve": {"extensions": [".ts"]}
        }));

        let merged = merge_settings(base, local);

        assert_eq!(merged["mode"], json!("development"));
        assert_eq!(merged["plugins"], json!([]));
        assert_eq!(merged["resolve"], json!({"extensions": [".ts"]}));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
        assert!(matches!(
            ConfigFormat::from_path(Path::new("bundler.config.js")),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "js"
        ));
    }
}
