//! Configuration for the smithpack bundle plugin.
//!
//! - [`BundleOptions`]: what the plugin is constructed with
//! - [`Pattern`] / [`PatternMatcher`]: which pipeline files become entries
//! - [`load_config`]: merge an external bundler config file under the
//!   plugin's own settings

pub mod error;
pub mod loader;
pub mod options;
pub mod pattern;

pub use error::*;
pub use loader::{ConfigFormat, ConfigResolver, ProjectResolver, load_config, merge_settings};
pub use options::{BundleOptions, DEFAULT_PATTERN, RESERVED_KEYS};
pub use pattern::{Pattern, PatternMatcher};
