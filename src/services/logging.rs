//! Tracing subscriber setup
//!
//! One subscriber for the whole process: an [`EnvFilter`] built from `RUST_LOG`
//! when set, otherwise from the configured level, and a json or console fmt layer.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogConfig, LogFormat};

/// Filter directives for the configured level
pub fn default_directives(config: &LogConfig) -> String {
    let level = config.level.as_directive();
    format!("jellyfin_newsletter={level},reqwest=warn,hyper=warn,{level}")
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives(config).into())
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(build_filter(config));

    match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Console => registry.with(fmt::layer().with_target(false)).try_init(),
    }
    .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(
        level = config.level.as_directive(),
        format = ?config.format,
        "Logger initialized"
    );
    Ok(())
}
