//! Error types for option parsing and config-file loading.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Resolution errors
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    // Parsing errors
    #[error("invalid config value in {field}: {hint}")]
    InvalidValue { field: String, hint: String },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid_value(field: impl Into<String>, hint: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.into(),
            hint: hint.to_string(),
        }
    }
}
