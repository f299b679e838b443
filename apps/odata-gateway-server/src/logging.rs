//! Logging setup.
//!
//! Logs go to stderr. Filter precedence: `RUST_LOG`, then `-v` flags, then
//! `logging.level`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::{LogFormat, LoggingConfig};

/// Filter directive for `-v` (info), `-vv` (debug) and `-vvv` or more (trace).
#[must_use]
pub fn verbosity_directive(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

fn build_filter(cfg: &LoggingConfig, verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback_filter(cfg, verbose))
}

fn fallback_filter(cfg: &LoggingConfig, verbose: u8) -> EnvFilter {
    verbosity_directive(verbose).map_or_else(|| EnvFilter::new(&cfg.level), EnvFilter::new)
}

/// Install the global subscriber. Later calls have no effect.
pub fn init(cfg: &LoggingConfig, verbose: u8) {
    let filter = build_filter(cfg, verbose);

    let installed = match cfg.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("global tracing subscriber already installed");
    }
}
