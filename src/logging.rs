//! Console and optional rolling-file `tracing` output.

use std::path::Path;

use anyhow::Context;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{AppConfig, LoggingConfig};

pub const LOG_FILE_PREFIX: &str = "restaurant-app";

/// Daily-rotated `restaurant-app.<date>.log`, keeping `retention_days` files.
pub fn file_appender(dir: &Path, retention_days: usize) -> anyhow::Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(retention_days)
        .build(dir)
        .context("creating log file appender")
}

/// Installs the global subscriber. Hold the returned guard until shutdown so
/// buffered file output gets flushed.
pub fn init(cfg: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(AppConfig::default_log_filter()))
        .context("invalid log filter")?;

    let console = if cfg.json {
        fmt::layer().with_target(false).json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let (file, guard) = match &cfg.dir {
        Some(dir) => {
            let (writer, guard) =
                tracing_appender::non_blocking(file_appender(dir, cfg.retention_days)?);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(guard)
}
