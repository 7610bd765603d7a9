//! Errors reported by the bundle plugin.

use std::path::PathBuf;

use miette::Diagnostic;
use smithpack_config::ConfigError;
use thiserror::Error;

use crate::bundler::BundlerError;

/// Result type alias for smithpack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Every way a bundle invocation can fail. None of them are retried.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// The pattern selected no files; the plugin is misconfigured.
    #[error("Pattern '{pattern}' did not match any files.")]
    #[diagnostic(
        code(smithpack::pattern_no_match),
        help("check `pattern` against the file map keys, which are relative to the source directory")
    )]
    PatternNoMatch { pattern: String },

    /// Options, pattern or config file could not be resolved.
    #[error("configuration error: {0}")]
    #[diagnostic(code(smithpack::config))]
    Config(#[from] ConfigError),

    /// The bundler itself failed, independent of the sources it was given.
    #[error("bundler run failed: {0}")]
    #[diagnostic(code(smithpack::compiler_run))]
    CompilerRun(#[from] BundlerError),

    /// The bundler ran but reported errors in the bundled sources.
    #[error("{}", .messages.join(", "))]
    #[diagnostic(code(smithpack::compilation))]
    Compilation { messages: Vec<String> },

    /// An expected output file is missing from the in-memory filesystem.
    #[error("bundler did not emit {}", .path.display())]
    #[diagnostic(
        code(smithpack::output_mismatch),
        help("output files are looked up as `[name].js`; the bundler must not rename them")
    )]
    OutputMismatch { path: PathBuf },
}

impl Error {
    /// Messages reported by the bundler, if this is a compilation error.
    pub fn compilation_messages(&self) -> Option<&[String]> {
        match self {
            Self::Compilation { messages } => Some(messages),
            _ => None,
        }
    }
}
