//! Tracing subscriber setup.
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Installs the global subscriber: stderr always, plus a log file when
/// `to_file` is set.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn setup_logging(to_file: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let file_layer = if to_file {
        let dir = log_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;

        let file_appender = tracing_appender::rolling::never(&dir, "duel-peer.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
        // Keep the writer alive for the life of the process.
        std::mem::forget(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    if to_file {
        tracing::info!("Log file: {}/duel-peer.log", log_dir().display());
    }
    Ok(())
}

/// Platform log directory, e.g. `~/.cache/duel-sync/logs` on Linux.
fn log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "duel-sync")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/duel-sync"))
        .join("logs")
}
