//! Tool invocation counters
//!
//! Counters go through a [`MetricsSink`]. [`PrometheusSink`] forwards them to
//! the `metrics` facade (exported in Prometheus text format when the `metrics`
//! feature is enabled); [`InMemorySink`] keeps them in process.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use telemetry_metrics::{counter, describe_counter, describe_gauge, gauge};

/// Invocation counter name
pub const TOTAL: &str = "mcp_prometheus_total";

/// Failed invocation counter name
pub const ERROR: &str = "mcp_prometheus_error";

const BUILD_INFO: &str = "mcp_prometheus_build_info";
const UP: &str = "mcp_prometheus_up";

/// Destination of the per-tool counters
pub trait MetricsSink: Send + Sync {
    /// Count one invocation of `tool`
    fn increment_total(&self, tool: &str);

    /// Count one failed invocation of `tool`
    fn increment_error(&self, tool: &str);
}

/// Sink backed by the `metrics` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusSink;

impl PrometheusSink {
    /// Create the sink and register metric descriptions
    #[must_use]
    pub fn new() -> Self {
        describe_counter!(TOTAL, "Total number of MCP tool invocations");
        describe_counter!(ERROR, "Total number of unsuccessful MCP tool invocations");
        Self
    }
}

impl MetricsSink for PrometheusSink {
    fn increment_total(&self, tool: &str) {
        counter!(TOTAL, "tool" => tool.to_string()).increment(1);
    }

    fn increment_error(&self, tool: &str) {
        counter!(ERROR, "tool" => tool.to_string()).increment(1);
    }
}

/// Counts for one tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolCounts {
    /// Invocations
    pub total: u64,
    /// Failed invocations
    pub errors: u64,
}

/// Lock-free in-process sink
#[derive(Debug, Default)]
pub struct InMemorySink {
    total: DashMap<String, AtomicU64>,
    errors: DashMap<String, AtomicU64>,
}

impl InMemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Invocations recorded for `tool`
    pub fn total(&self, tool: &str) -> u64 {
        self.total
            .get(tool)
            .map_or(0, |entry| entry.load(Ordering::Relaxed))
    }

    /// Failures recorded for `tool`
    pub fn errors(&self, tool: &str) -> u64 {
        self.errors
            .get(tool)
            .map_or(0, |entry| entry.load(Ordering::Relaxed))
    }

    /// Counts for every tool invoked so far, sorted by name
    pub fn snapshot(&self) -> BTreeMap<String, ToolCounts> {
        let mut out = BTreeMap::new();
        for entry in &self.total {
            out.insert(
                entry.key().clone(),
                ToolCounts {
                    total: entry.value().load(Ordering::Relaxed),
                    errors: self.errors(entry.key()),
                },
            );
        }
        out
    }

    fn bump(map: &DashMap<String, AtomicU64>, tool: &str) {
        if let Some(counter) = map.get(tool) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        map.entry(tool.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }
}

impl MetricsSink for InMemorySink {
    fn increment_total(&self, tool: &str) {
        Self::bump(&self.total, tool);
    }

    fn increment_error(&self, tool: &str) {
        Self::bump(&self.errors, tool);
    }
}

/// Record the build info counter (labels: version, os)
pub fn record_build_info() {
    describe_counter!(BUILD_INFO, "A metric with a constant '1' value labeled by version and OS");
    counter!(
        BUILD_INFO,
        "version" => env!("CARGO_PKG_VERSION"),
        "os" => std::env::consts::OS,
    )
    .increment(1);
}

/// Set the `up` gauge: 1 while serving, 0 once the server has failed
pub fn set_up(up: bool) {
    describe_gauge!(UP, "Whether the MCP server is serving");
    gauge!(UP).set(if up { 1.0 } else { 0.0 });
}

#[cfg(feature = "metrics")]
pub use exporter::{MetricsExporter, install_recorder};

#[cfg(feature = "metrics")]
mod exporter {
    use std::net::SocketAddr;

    use axum::{Router, routing::get};
    use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;
    use tracing::info;

    use crate::{Error, Result};

    /// Install the global Prometheus recorder.
    ///
    /// Fails if another recorder is already installed.
    pub fn install_recorder() -> Result<PrometheusHandle> {
        PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {e}")))
    }

    /// HTTP endpoint serving the text exposition
    pub struct MetricsExporter {
        handle: PrometheusHandle,
        path: String,
    }

    impl MetricsExporter {
        /// Create an exporter serving `handle` on `path`
        pub fn new(handle: PrometheusHandle, path: impl Into<String>) -> Self {
            Self {
                handle,
                path: path.into(),
            }
        }

        /// Router with the exposition route
        pub fn router(&self) -> Router {
            let handle = self.handle.clone();
            Router::new().route(
                &self.path,
                get(move || {
                    let handle = handle.clone();
                    async move { handle.render() }
                }),
            )
        }

        /// Serve until `shutdown` is cancelled
        pub async fn serve(self, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
            let listener = TcpListener::bind(addr).await?;
            info!(addr = %addr, path = %self.path, "Serving metrics");

            axum::serve(listener, self.router())
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
                .map_err(|e| Error::Transport(e.to_string()))
        }
    }
}
