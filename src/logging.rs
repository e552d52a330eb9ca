//! Logging setup.
//!
//! The log level is controlled via the `PINMAP_LOG` environment variable
//! (`debug`, `info`, `warn`, `error`; default `info`). Plain CLI commands log
//! to stderr; the TUI writes to a log file instead so tracing output does not
//! fight ratatui for the terminal.

use std::path::Path;
use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::errors::Result;

// Keeps the non-blocking writer alive for the process lifetime; init is
// called once at startup.
static GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("PINMAP_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging to stderr.
pub fn init_stderr() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize logging to a file, for TUI sessions.
pub fn init_file(log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::options()
        .create(true)
        .append(true)
        .open(log_file)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();
    Ok(())
}
