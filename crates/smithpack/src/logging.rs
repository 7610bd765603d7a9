//! Subscriber setup for binaries and tests that drive smithpack directly.
//!
//! Only built with the `logging` feature. Library users should install their
//! own subscriber; smithpack itself only emits `tracing` events.

use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt as layer_fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Crates whose events the default filter lets through.
const CRATES: [&str; 3] = ["smithpack", "smithpack_config", "smithpack_pipeline"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    /// Selected file counts and per-run timings
    #[default]
    Info,
    /// Compiler reuse, config resolution and renames
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Silent => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    /// `smithpack=<level>,...` for every smithpack crate.
    fn directives(self) -> String {
        let level = self.as_level_filter();
        CRATES
            .iter()
            .map(|krate| format!("{krate}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("Invalid log level: {other}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Silent => f.write_str("off"),
            other => write!(f, "{}", other.as_level_filter()),
        }
    }
}

/// Install a compact stderr subscriber showing smithpack events at `level`.
///
/// Only the first call in a process has any effect. Panics if another global
/// subscriber was installed outside these functions.
///
/// ```rust,no_run
/// use smithpack::logging::{LogLevel, init_logging};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    INIT.call_once(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .parse_lossy(level.directives());
        install(filter);
    });
}

/// Install a subscriber filtered by `RUST_LOG`, falling back to `info` for
/// the smithpack crates when it is unset or invalid.
pub fn init_logging_from_env() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .parse_lossy(LogLevel::Info.directives())
        });
        install(filter);
    });
}

fn install(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(layer_fmt::layer().compact().with_target(false).without_time())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("off".parse::<LogLevel>().unwrap(), LogLevel::Silent);
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn display_matches_filter_syntax() {
        assert_eq!(LogLevel::Silent.to_string(), "off");
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::default().to_string(), "info");
    }

    #[test]
    fn directives_cover_every_crate() {
        assert_eq!(
            LogLevel::Debug.directives(),
            "smithpack=debug,smithpack_config=debug,smithpack_pipeline=debug"
        );
    }
}
