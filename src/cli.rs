//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

/// MCP server for the Prometheus HTTP API
#[derive(Parser, Debug)]
#[command(name = "prometheus-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "PROMETHEUS_MCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Prometheus base URL
    #[arg(long, env = "PROMETHEUS_MCP_URL")]
    pub prometheus: Option<String>,

    /// Address to serve MCP over HTTP (e.g. `:7777`); stdio when unset
    #[arg(long, env = "PROMETHEUS_MCP_SERVER_ADDR")]
    pub server_addr: Option<String>,

    /// HTTP path of the MCP endpoint
    #[arg(long, env = "PROMETHEUS_MCP_SERVER_PATH")]
    pub server_path: Option<String>,

    /// Address to expose metrics on; disabled when unset
    #[arg(long, env = "PROMETHEUS_MCP_METRIC_ADDR")]
    pub metric_addr: Option<String>,

    /// HTTP path of the metrics endpoint
    #[arg(long, env = "PROMETHEUS_MCP_METRIC_PATH")]
    pub metric_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "PROMETHEUS_MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "PROMETHEUS_MCP_LOG_FORMAT")]
    pub log_format: Option<String>,

    /// Enable debug logging
    #[arg(long, env = "PROMETHEUS_MCP_DEBUG")]
    pub debug: bool,
}

impl Cli {
    /// Effective log level; `--debug` wins
    #[must_use]
    pub fn effective_log_level(&self) -> &str {
        if self.debug { "debug" } else { &self.log_level }
    }
}
