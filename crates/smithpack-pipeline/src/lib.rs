//! # smithpack-pipeline
//!
//! The host side of a smithpack build: an ordered map of in-memory files,
//! the [`Plugin`] trait every pipeline step implements, and [`Smith`], a small
//! runner that reads a source directory, runs plugins in registration order
//! and writes the result to a destination directory.
//!
//! ```no_run
//! use smithpack_pipeline::Smith;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let files = Smith::new("./site")
//!     .with_source("src")
//!     .with_destination("build")
//!     .clean(true)
//!     .build()
//!     .await?;
//!
//! for path in files.keys() {
//!     println!("wrote {path}");
//! }
//! # Ok(()) }
//! ```

pub mod error;
pub mod file;
pub mod plugin;
pub mod smith;

pub use error::{PipelineError, Result};
pub use file::{FileMap, FileRecord};
pub use plugin::{Pipeline, Plugin, PluginError};
pub use smith::Smith;
