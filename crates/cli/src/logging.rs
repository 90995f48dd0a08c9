//! Logging backend for the `tally` binary.
//!
//! The library logs through the `log` facade; the subscriber installed here
//! picks those records up through the `tracing-log` bridge. Output goes to
//! stderr so stdout stays clean for `--json` and CSV export.
//!
//! - 0 (no `-v`): warn
//! - 1 (`-v`): debug
//! - 2+ (`-vv`): trace
//!
//! `RUST_LOG` overrides the verbosity flag when set.

use std::io::{self, IsTerminal};

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub with_target: bool,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            with_target: false,
            with_ansi: io::stderr().is_terminal(),
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            with_target: verbosity > 0,
            ..Default::default()
        }
    }
}

/// Install the global subscriber. Call once, at startup.
pub fn init_logging(config: &LogConfig) {
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(config.with_target)
        .without_time();

    let installed = tracing_subscriber::registry()
        .with(build_env_filter(config.level))
        .with(layer)
        .try_init();
    if installed.is_err() {
        log::debug!("logging already initialized");
    }
}

/// `RUST_LOG` wins; otherwise our crates log at `level` and everything else
/// stays at warn.
fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,tally={level},tally_recon={level}"))
    })
}
