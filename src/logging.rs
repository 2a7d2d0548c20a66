//! Tracing setup for the CLI.
//!
//! Logs go to stderr unless `logging.to_file` is set, in which case each run
//! writes `<state_dir>/logs/feddash-{datetime}.log` through a non-blocking
//! appender.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Keeps the log writer alive; drop it last so buffered lines are flushed.
pub struct LoggingHandle {
    _guard: Option<WorkerGuard>,
    log_file_path: Option<PathBuf>,
}

impl LoggingHandle {
    /// Where this run's log file is, when file logging is on
    pub fn log_file_path(&self) -> Option<&PathBuf> {
        self.log_file_path.as_ref()
    }
}

/// `--debug` beats the configured level
fn effective_level(config: &Config, debug_override: bool) -> &str {
    if debug_override {
        "debug"
    } else {
        &config.logging.level
    }
}

/// `RUST_LOG` beats both
fn build_filter(config: &Config, debug_override: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(effective_level(config, debug_override)))
}

fn log_filename(timestamp: &str) -> String {
    format!("feddash-{}.log", timestamp)
}

struct LogTarget {
    writer: BoxMakeWriter,
    guard: Option<WorkerGuard>,
    path: Option<PathBuf>,
}

fn file_target(config: &Config) -> Result<LogTarget> {
    let logs_dir = config.logs_path();
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

    let filename = log_filename(&chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string());
    let path = logs_dir.join(&filename);
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&logs_dir, &filename));

    Ok(LogTarget {
        writer: BoxMakeWriter::new(writer),
        guard: Some(guard),
        path: Some(path),
    })
}

/// Install the global subscriber. Call once, early in `main`.
pub fn init_logging(config: &Config, debug_override: bool) -> Result<LoggingHandle> {
    let to_file = config.logging.to_file;
    let target = if to_file {
        file_target(config)?
    } else {
        LogTarget {
            writer: BoxMakeWriter::new(std::io::stderr),
            guard: None,
            path: None,
        }
    };

    tracing_subscriber::registry()
        .with(build_filter(config, debug_override))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(!to_file)
                .with_writer(target.writer),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingHandle {
        _guard: target.guard,
        log_file_path: target.path,
    })
}
