//! Tracing subscriber setup for the operator CLI.
//!
//! Logs go to stderr (stdout carries command output) or to the configured
//! file. `RUST_LOG` takes precedence over the configured level.

use super::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Fallback filter when neither `RUST_LOG` nor the config level parses
const FALLBACK_FILTER: &str = "info";

/// Build the filter: `RUST_LOG`, then the configured level, then `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(config: &LoggingConfig) -> Result<(), std::io::Error> {
    let filter = build_filter(&config.level);

    if let Some(path) = &config.file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init();
    }

    Ok(())
}
