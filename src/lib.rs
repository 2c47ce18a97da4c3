//! Prometheus MCP server library
//!
//! Exposes the Prometheus HTTP API as schema-described MCP tools.
//!
//! # Layout
//!
//! - **tools**: descriptors, typed argument extraction, the shared invocation
//!   pipeline and the query/management tool sets
//! - **backend**: the `PrometheusApi` trait and its reqwest implementation
//! - **management**: readiness/health probe against `/-/ready` and `/-/healthy`
//! - **server**: JSON-RPC dispatch over stdio or HTTP
//! - **metrics**: per-tool counters and the optional Prometheus exporter

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod metrics;
pub mod promtime;
pub mod protocol;
pub mod server;
pub mod tools;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging.
///
/// Output goes to stderr; stdout is reserved for the stdio transport.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|e| Error::Internal(format!("Failed to install subscriber: {e}")))
}
