//! Console and per-run file logging.
//!
//! Console output is installed once as the global subscriber. The per-run log
//! file is not global: [`RunLog`] owns its own `tracing::Dispatch` (console +
//! file) which the controller attaches to the run future and every unit it
//! spawns. Closing the handle flushes the file writer.

use chrono::Local;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::OrchestratorError;

fn console_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the console subscriber. Safe to call more than once.
pub fn init_console() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(console_filter()))
        .try_init();
}

/// Timestamp used in the run log file name.
pub fn date_time_tag() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Per-invocation log file and the dispatch that writes to it.
pub struct RunLog {
    path: PathBuf,
    dispatch: Dispatch,
    guard: WorkerGuard,
}

impl RunLog {
    /// Open (append) the log file at `path` and build a dispatch writing to
    /// both the console and the file.
    pub fn open(path: PathBuf, settings: &LoggingConfig) -> Result<Self, OrchestratorError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| OrchestratorError::LogFileFailed {
                path: path.clone(),
                source,
            })?;
        let (writer, guard) = tracing_appender::non_blocking(file);

        let level = settings
            .level
            .parse::<LevelFilter>()
            .unwrap_or(LevelFilter::DEBUG);

        let file_layer = match settings.format {
            LogFormat::Text => fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(level)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(level)
                .boxed(),
        };

        let subscriber = tracing_subscriber::registry()
            .with(file_layer)
            .with(fmt::layer().with_target(false).with_filter(console_filter()));

        Ok(Self {
            path,
            dispatch: Dispatch::new(subscriber),
            guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Flush pending lines and detach the file. Returns the log path.
    pub fn close(self) -> PathBuf {
        let Self {
            path,
            dispatch,
            guard,
        } = self;
        drop(dispatch);
        drop(guard);
        path
    }
}
