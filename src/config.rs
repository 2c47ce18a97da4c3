//! Configuration management

use std::{net::SocketAddr, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::Cli;
use crate::management::DEFAULT_PROBE_TIMEOUT;
use crate::{Error, Result};

/// Prefix for environment overrides (`PROMETHEUS_MCP_PROMETHEUS__URL`, ...)
pub const ENV_PREFIX: &str = "PROMETHEUS_MCP_";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prometheus backend
    pub prometheus: PrometheusConfig,
    /// MCP transport
    pub server: ServerConfig,
    /// Metrics exposition
    pub metrics: MetricsConfig,
}

/// Prometheus backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusConfig {
    /// Base URL of the Prometheus server
    pub url: String,
    /// Timeout of readiness probes
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9090".to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// MCP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP bind address; stdio when empty
    pub addr: String,
    /// HTTP path of the MCP endpoint
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: String::new(),
            path: "/mcp".to_string(),
        }
    }
}

impl ServerConfig {
    /// Parsed bind address, `None` for stdio
    pub fn bind_addr(&self) -> Result<Option<SocketAddr>> {
        optional_bind_addr(&self.addr)
    }
}

/// Metrics exposition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Exporter bind address; disabled when empty
    pub addr: String,
    /// HTTP path of the exporter
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            addr: String::new(),
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Parsed bind address, `None` when disabled
    pub fn bind_addr(&self) -> Result<Option<SocketAddr>> {
        optional_bind_addr(&self.addr)
    }
}

impl Config {
    /// Load configuration from an optional YAML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply command-line overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(ref url) = cli.prometheus {
            self.prometheus.url.clone_from(url);
        }
        if let Some(ref addr) = cli.server_addr {
            self.server.addr.clone_from(addr);
        }
        if let Some(ref path) = cli.server_path {
            self.server.path.clone_from(path);
        }
        if let Some(ref addr) = cli.metric_addr {
            self.metrics.addr.clone_from(addr);
        }
        if let Some(ref path) = cli.metric_path {
            self.metrics.path.clone_from(path);
        }
    }

    /// Check the values needed to start
    pub fn validate(&self) -> Result<()> {
        if self.prometheus.url.trim().is_empty() {
            return Err(Error::Config("Prometheus URL must not be empty".to_string()));
        }
        Url::parse(&self.prometheus.url).map_err(|e| {
            Error::Config(format!(
                "Invalid Prometheus URL '{}': {e}",
                self.prometheus.url
            ))
        })?;
        if !self.server.path.starts_with('/') {
            return Err(Error::Config(format!(
                "Server path must start with '/': {}",
                self.server.path
            )));
        }
        if !self.metrics.path.starts_with('/') {
            return Err(Error::Config(format!(
                "Metrics path must start with '/': {}",
                self.metrics.path
            )));
        }
        self.server.bind_addr()?;
        self.metrics.bind_addr()?;
        Ok(())
    }
}

fn optional_bind_addr(addr: &str) -> Result<Option<SocketAddr>> {
    let addr = addr.trim();
    if addr.is_empty() {
        return Ok(None);
    }
    parse_bind_addr(addr).map(Some)
}

/// Parse a listen address; a bare `:port` binds every interface
pub fn parse_bind_addr(addr: &str) -> Result<SocketAddr> {
    let full = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    };
    full.parse()
        .map_err(|e| Error::Config(format!("Invalid listen address '{addr}': {e}")))
}
