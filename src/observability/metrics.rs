//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_METRICS_PORT: u16 = 9090;

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether the Prometheus exporter is installed.
    pub enabled: bool,
    /// Address the exporter listens on.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_METRICS_PORT),
        }
    }
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: Option<&MetricsSettings>) -> Self {
        let mut config = Self::default();
        if let Some(settings) = settings {
            config.enabled = settings.enabled.unwrap_or(false);
            if let Some(port) = settings.port {
                config.listen_addr.set_port(port);
            }
        }

        if let Some(enabled) = std::env::var("METAPORT_METRICS_ENABLED")
            .ok()
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        {
            config.enabled = enabled;
        }

        config
    }
}

/// Installs the Prometheus exporter when enabled.
///
/// Without an installed recorder, `metrics` macros are no-ops.
pub(super) fn install_prometheus(config: &MetricsConfig) -> Result<bool> {
    if !config.enabled {
        return Ok(false);
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .install()
        .map_err(|e| Error::operation("install_metrics_exporter", e))?;

    tracing::info!(addr = %config.listen_addr, "Prometheus metrics exporter listening");
    Ok(true)
}
