//! prometheus-mcp - MCP server for the Prometheus HTTP API

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use prometheus_mcp::{
    Result,
    backend::HttpPrometheusClient,
    cli::Cli,
    config::Config,
    management::{ManagementClient, ReadinessProbe},
    metrics::{self, InMemorySink, MetricsSink},
    server::{HttpServer, McpServer, serve_stdio},
    setup_tracing,
    tools::build_registry,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(cli.effective_log_level(), cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            config.apply_cli(&cli);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        os = std::env::consts::OS,
        prometheus = %config.prometheus.url,
        "Starting prometheus-mcp"
    );

    match run(config).await {
        Ok(()) => {
            info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            metrics::set_up(false);
            error!("Server error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let (sink, in_memory) = build_sink(&config, &shutdown)?;
    metrics::record_build_info();

    let api = Arc::new(HttpPrometheusClient::new(&config.prometheus.url)?);
    let probe = Arc::new(ManagementClient::with_timeout(
        &config.prometheus.url,
        config.prometheus.probe_timeout,
    )?);

    match probe.healthy(&shutdown).await {
        Ok(status) if status.is_success() => info!("Prometheus is healthy"),
        Ok(status) => warn!(status = %status, "Prometheus health check failed"),
        Err(e) => warn!(error = %e, "Prometheus is unreachable"),
    }

    let registry = Arc::new(build_registry(api, probe, sink)?);
    info!(
        count = registry.len(),
        tools = ?registry.names().collect::<Vec<_>>(),
        "Tools registered"
    );

    let server = McpServer::new(registry, shutdown.clone());
    metrics::set_up(true);

    let result = match config.server.bind_addr()? {
        Some(addr) => HttpServer::new(server, config.server.path.clone()).serve(addr).await,
        None => serve_stdio(server, tokio::io::stdin(), tokio::io::stdout()).await,
    };
    shutdown.cancel();

    if let Some(counts) = in_memory {
        for (tool, counts) in counts.snapshot() {
            info!(tool = %tool, total = counts.total, errors = counts.errors, "Tool usage");
        }
    }

    result
}

/// Counter sink: the Prometheus exporter when configured, else in-memory counts
fn build_sink(
    config: &Config,
    shutdown: &CancellationToken,
) -> Result<(Arc<dyn MetricsSink>, Option<Arc<InMemorySink>>)> {
    if let Some(addr) = config.metrics.bind_addr()? {
        if let Some(sink) = exported_sink(addr, &config.metrics.path, shutdown)? {
            return Ok((sink, None));
        }
    }

    let sink = Arc::new(InMemorySink::new());
    Ok((Arc::clone(&sink) as Arc<dyn MetricsSink>, Some(sink)))
}

#[cfg(feature = "metrics")]
fn exported_sink(
    addr: SocketAddr,
    path: &str,
    shutdown: &CancellationToken,
) -> Result<Option<Arc<dyn MetricsSink>>> {
    let handle = metrics::install_recorder()?;
    let exporter = metrics::MetricsExporter::new(handle, path);
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = exporter.serve(addr, shutdown).await {
            error!(error = %e, "Metrics exporter failed");
        }
    });
    Ok(Some(Arc::new(metrics::PrometheusSink::new())))
}

#[cfg(not(feature = "metrics"))]
fn exported_sink(
    _addr: SocketAddr,
    _path: &str,
    _shutdown: &CancellationToken,
) -> Result<Option<Arc<dyn MetricsSink>>> {
    warn!("Built without the `metrics` feature; ignoring metrics.addr");
    Ok(None)
}

/// Cancel `token` on Ctrl+C or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
        () = token.cancelled() => return,
    }

    info!("Shutdown signal received");
    token.cancel();
}
