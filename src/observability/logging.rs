//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;

const DEFAULT_LOG_DIRECTIVES: &str = "metaport=info,warn";
const VERBOSE_LOG_DIRECTIVES: &str = "metaport=debug,info";

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name, defaulting to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directives.
    pub directives: String,
    /// Optional log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            directives: DEFAULT_LOG_DIRECTIVES.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from config settings with env overrides.
    ///
    /// `METAPORT_LOG` (then `RUST_LOG`) overrides the filter directives and
    /// `METAPORT_LOG_FORMAT` overrides the format.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let mut config = Self::default();

        if let Some(settings) = settings {
            if let Some(format) = &settings.format {
                config.format = LogFormat::parse(format);
            }
            if let Some(level) = &settings.level {
                config.directives.clone_from(level);
            }
            config.file.clone_from(&settings.file);
        }

        if verbose {
            config.directives = VERBOSE_LOG_DIRECTIVES.to_string();
        }

        if let Some(directives) = std::env::var("METAPORT_LOG")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .filter(|v| !v.trim().is_empty())
        {
            config.directives = directives;
        }
        if let Ok(format) = std::env::var("METAPORT_LOG_FORMAT") {
            config.format = LogFormat::parse(&format);
        }

        config
    }
}
