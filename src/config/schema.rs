//! Configuration schema definitions.
//!
//! Field names follow the historical `config.toml` layout
//! (`pattern`, `port`, `prometheus_server`, `debug`), extended with
//! optional sections for logging and metrics.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Header carrying the tenant identifier.
pub const DEFAULT_TENANT_HEADER: &str = "X-Grafana-Org-Id";

/// Field stripped from upstream responses.
pub const DEFAULT_SENSITIVE_FIELD: &str = "orgtoken";

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Path pattern served by the proxy. A trailing `/` matches the subtree.
    pub pattern: String,

    /// Port to listen on (all interfaces).
    pub port: u16,

    /// Base URL of the Prometheus server requests are forwarded to.
    #[serde(rename = "prometheus_server")]
    pub upstream: String,

    /// Enables debug logging, including rewrite diagnostics.
    pub debug: bool,

    /// Request header the tenant identifier is read from.
    pub tenant_header: String,

    /// Response field removed before the body reaches the client.
    pub sensitive_field: String,

    /// Log sink settings.
    pub log: LogConfig,

    /// Prometheus exporter settings for the proxy's own metrics.
    pub metrics: MetricsConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            pattern: "/".to_string(),
            port: 9090,
            upstream: "http://localhost:9090".to_string(),
            debug: false,
            tenant_header: DEFAULT_TENANT_HEADER.to_string(),
            sensitive_field: DEFAULT_SENSITIVE_FIELD.to_string(),
            log: LogConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Address the HTTP listener binds to.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Upstream base URL without a trailing slash.
    pub fn upstream_base(&self) -> &str {
        self.upstream.trim_end_matches('/')
    }
}

/// Log sink configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Append logs to this file instead of stdout.
    pub file: Option<PathBuf>,
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus scrape endpoint.
    pub enabled: bool,

    /// Scrape endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "127.0.0.1:9091".to_string(),
        }
    }
}
