//! Logging init: file under the XDG state dir, stderr as fallback.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cascade_core=debug"))
}

/// Initialize structured logging to `~/.local/state/cascade/cascade.log` and
/// return the log path. Errors (unwritable state dir) are left to the caller,
/// which typically falls back to [`init_logging_stderr`].
pub fn init_logging() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("cascade")?;
    let log_path = dirs.place_state_file("cascade.log")?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Each log line gets its own writer; if cloning the handle fails the
    // line goes to stderr instead of vanishing.
    let make_writer = move || -> Box<dyn io::Write + Send> {
        match file.try_clone() {
            Ok(f) => Box::new(f),
            Err(_) => Box::new(io::stderr()),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_writer(make_writer)
        .with_ansi(false)
        .init();

    tracing::info!(path = %log_path.display(), "logging initialized");
    Ok(log_path)
}

/// Stderr-only logging, for when the state dir cannot be used.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}
