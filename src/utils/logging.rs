//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over `server.log_level`. Output goes to stderr so the
//! `ask` subcommand can print the answer alone on stdout.

use crate::utils::toml_config::LogFormat;
use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Build the filter from `RUST_LOG`, falling back to `default_level`.
pub fn env_filter(default_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("Invalid log level '{}'", default_level)),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(default_level: &str, format: LogFormat) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(default_level)?);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
    }
    .context("Failed to install tracing subscriber")
}
