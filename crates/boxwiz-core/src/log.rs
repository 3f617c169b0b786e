//! Logging system for boxwiz.
//!
//! Structured logging through `tracing`, written to stderr and optionally
//! to a log file. `RUST_LOG` overrides the configured level.

use boxwiz_types::{LogLevel, WizardError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogSettings;

/// Build the filter for a configured level.
///
/// `RUST_LOG` wins when set; otherwise boxwiz crates log at `level` and
/// dependencies at `warn`.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)))
}

fn default_directive(level: LogLevel) -> String {
    let level = level.as_directive();
    format!("warn,boxwiz={level},boxwiz_core={level},boxwiz_template={level},boxwiz_parser={level},boxwiz_document={level},boxwiz_state={level},boxwiz_cli={level}")
}

/// Initialize logging from settings.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the program when a log file is configured.
pub fn init(settings: &LogSettings) -> Result<Option<WorkerGuard>> {
    let stderr_layer = if settings.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_target(false).with_writer(std::io::stderr).boxed()
    };

    let (file_layer, guard) = match &settings.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| WizardError::Config(format!("Invalid log file: {}", path.display())))?;
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(settings.level))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| WizardError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}
