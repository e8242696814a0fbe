//! Observability: logging, metrics and the import event bus.

mod event_bus;
mod logging;
mod metrics;

pub use event_bus::{DEFAULT_EVENT_BUS_CAPACITY, EventBus, FilteredReceiver};
pub use logging::{LogFormat, LoggingConfig};
pub use metrics::MetricsConfig;

use crate::config::MetaportConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Full observability configuration.
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl ObservabilityConfig {
    /// Builds the configuration from application config with env overrides.
    #[must_use]
    pub fn from_config(config: &MetaportConfig, verbose: bool) -> Self {
        Self {
            logging: LoggingConfig::from_settings(Some(&config.logging), verbose),
            metrics: MetricsConfig::from_settings(Some(&config.metrics)),
        }
    }
}

/// Initializes logging and metrics for the process.
///
/// Logs go to stderr, or to the configured file (appended, without ANSI
/// colors). The Prometheus exporter is installed only when enabled.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed, the log
/// file cannot be opened or the metrics exporter fails to start.
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.logging.directives)
        .map_err(|e| Error::operation("observability_init", e))?;

    let (writer, ansi) = match &config.logging.file {
        Some(path) => (BoxMakeWriter::new(open_log_file(path)?), false),
        None => (BoxMakeWriter::new(io::stderr), true),
    };
    let (json, pretty) = match config.logging.format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(writer),
            ),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(ansi)
                    .with_writer(writer),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .try_init()
        .map_err(|e| Error::operation("observability_init", e))?;

    metrics::install_prometheus(&config.metrics)?;
    Ok(())
}

/// Opens `path` for appending, creating parent directories.
fn open_log_file(path: &Path) -> Result<Mutex<std::fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_log_dir", e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(Mutex::new)
        .map_err(|e| Error::operation("open_log_file", format!("{}: {e}", path.display())))
}
