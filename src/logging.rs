//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! Two modes:
//! - **Session** ([`init_session`]): JSON file layer with daily rotation.
//!   Nothing goes to the terminal, which belongs to the conversation.
//! - **CLI** ([`init_cli`]): human-readable stderr output for one-shot
//!   subcommands.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Holds the non-blocking writer guard for file logging.
///
/// Must be kept alive for the duration of the process; dropping it flushes
/// pending entries and closes the file.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialise logging for an interactive session.
///
/// Writes JSON logs to `{logs_dir}/nutriplan.log.YYYY-MM-DD` with daily
/// rotation. The terminal stays clean for the chat itself. Verbosity is
/// controlled by `RUST_LOG` (default: `info`).
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created.
pub fn init_session(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create logs directory {}: {e}",
            logs_dir.display()
        )
    })?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "nutriplan.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking),
        )
        .init();

    Ok(LoggingGuard { _guard: guard })
}

/// Initialise stderr-only logging for one-shot subcommands.
///
/// Controlled by `RUST_LOG` (default: `info`).
pub fn init_cli() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}
