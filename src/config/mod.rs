//! Configuration management.

use crate::security::Role;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default import adapter recorded on jobs.
pub const DEFAULT_ADAPTER: &str = "spreadsheet";

/// Main configuration for metaport.
#[derive(Debug, Clone)]
pub struct MetaportConfig {
    /// Path to the data directory.
    pub data_dir: PathBuf,
    /// Path to the metadata definition file.
    pub metadata_path: PathBuf,
    /// Job store backend.
    pub job_store: JobStoreBackend,
    /// Root directory of the content store. Defaults to `{data_dir}/content`.
    pub content_dir: Option<PathBuf>,
    /// Optional message catalog overriding the built-in messages.
    pub translations_path: Option<PathBuf>,
    /// Adapter recorded on jobs when the action does not name one.
    pub default_adapter: String,
    /// Role granted to callers by the built-in authorizer.
    pub default_role: Role,
    /// HTTP port for `serve`.
    pub port: u16,
    /// Event bus buffer capacity.
    pub event_bus_capacity: usize,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
}

/// Job store backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStoreBackend {
    /// Non-persistent store (tests, dry runs).
    Memory,
    /// `SQLite` database. Defaults to `{data_dir}/imports.db`.
    Sqlite(Option<PathBuf>),
}

impl JobStoreBackend {
    /// Parses a backend name.
    #[must_use]
    pub fn parse(s: &str, path: Option<PathBuf>) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Self::Memory,
            _ => Self::Sqlite(path),
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directives.
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<PathBuf>,
}

/// Metrics section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Whether to install the Prometheus exporter.
    pub enabled: Option<bool>,
    /// Exporter port.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Metadata definition file.
    pub metadata_path: Option<String>,
    /// Content store root.
    pub content_dir: Option<String>,
    /// Message catalog.
    pub translations_path: Option<String>,
    /// Default adapter.
    pub default_adapter: Option<String>,
    /// Default role.
    pub default_role: Option<String>,
    /// Event bus capacity.
    pub event_bus_capacity: Option<usize>,
    /// Job store section.
    pub job_store: Option<ConfigFileJobStore>,
    /// HTTP section.
    pub http: Option<ConfigFileHttp>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Metrics section.
    pub metrics: Option<MetricsSettings>,
}

/// Job store section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileJobStore {
    /// `sqlite` or `memory`.
    pub backend: Option<String>,
    /// Database path for `sqlite`.
    pub path: Option<String>,
}

/// HTTP section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileHttp {
    /// Listen port.
    pub port: Option<u16>,
}

impl Default for MetaportConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".metaport"),
            metadata_path: PathBuf::from("metadata.toml"),
            job_store: JobStoreBackend::Sqlite(None),
            content_dir: None,
            translations_path: None,
            default_adapter: DEFAULT_ADAPTER.to_string(),
            default_role: Role::Operator,
            port: 8080,
            event_bus_capacity: crate::observability::DEFAULT_EVENT_BUS_CAPACITY,
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

impl MetaportConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::operation("read_config_file", format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::operation("parse_config_file", e))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/metaport/` on macOS)
    /// 2. XDG config dir (`~/.config/metaport/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("metaport").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("metaport")
                .join("config.toml"),
        ];

        for candidate in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(candidate) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(
                        path = %candidate.display(),
                        error = %e,
                        "Ignoring unreadable config file"
                    );
                },
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `MetaportConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(metadata_path) = file.metadata_path {
            config.metadata_path = PathBuf::from(metadata_path);
        }
        config.content_dir = file.content_dir.map(PathBuf::from);
        config.translations_path = file.translations_path.map(PathBuf::from);
        if let Some(adapter) = file.default_adapter {
            config.default_adapter = adapter;
        }
        if let Some(role) = file.default_role {
            config.default_role = Role::parse(&role)
                .ok_or_else(|| Error::InvalidInput(format!("unknown role: {role}")))?;
        }
        if let Some(capacity) = file.event_bus_capacity {
            config.event_bus_capacity = capacity;
        }
        if let Some(store) = file.job_store {
            config.job_store = JobStoreBackend::parse(
                store.backend.as_deref().unwrap_or("sqlite"),
                store.path.map(PathBuf::from),
            );
        }
        if let Some(port) = file.http.and_then(|h| h.port) {
            config.port = port;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }
        if let Some(metrics) = file.metrics {
            config.metrics = metrics;
        }

        Ok(config)
    }

    /// Applies `METAPORT_*` environment overrides.
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("METAPORT_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("METAPORT_METADATA") {
            self.metadata_path = PathBuf::from(path);
        }
        if let Ok(port) = std::env::var("METAPORT_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid METAPORT_PORT"),
            }
        }
        if let Ok(role) = std::env::var("METAPORT_DEFAULT_ROLE") {
            match Role::parse(&role) {
                Some(role) => self.default_role = role,
                None => tracing::warn!(value = %role, "Ignoring invalid METAPORT_DEFAULT_ROLE"),
            }
        }
        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the metadata definition file.
    #[must_use]
    pub fn with_metadata_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_path = path.into();
        self
    }

    /// Returns the effective content store root.
    #[must_use]
    pub fn content_root(&self) -> PathBuf {
        self.content_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("content"))
    }

    /// Returns the file run requests are spooled to.
    #[must_use]
    pub fn run_spool_path(&self) -> PathBuf {
        self.data_dir.join("run-requests.jsonl")
    }
}
