use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_LOG_FILE: &str = "pizza_radar.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to stderr; `RUST_LOG` overrides the `info` default.
pub fn init_stderr() -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init()
        .context("install tracing subscriber")
}

/// Append to a log file, for front-ends that own the terminal.
pub fn init_file(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file));
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init()
        .context("install tracing subscriber")
}
