//! Tracing subscriber setup.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::errors::{QemuDiskError, QemuDiskResult};

const LOG_FILE_PREFIX: &str = "qemudisk.log";

#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Filter used when `RUST_LOG` is unset (e.g. `"info"`, `"qemudisk=debug"`).
    pub level: String,
    /// Also write plain-text logs to a daily rolling file in this directory.
    pub log_dir: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            ansi: true,
        }
    }
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for as long as logs should reach the file; dropping it
/// flushes and stops the background writer.
pub fn init_logging(options: &LoggingOptions) -> QemuDiskResult<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&options.level))
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(options.ansi)
        .with_target(false)
        .with_filter(filter().map_err(|e| {
            QemuDiskError::Config(format!("invalid log level '{}': {}", options.level, e))
        })?);

    let (file_layer, guard) = match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| QemuDiskError::Io {
                context: format!("creating log directory {}", dir.display()),
                source: e,
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter().map_err(|e| {
                    QemuDiskError::Config(format!("invalid log level '{}': {}", options.level, e))
                })?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| QemuDiskError::Internal(format!("failed to install logger: {}", e)))?;

    Ok(guard)
}
