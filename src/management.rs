//! Prometheus management API probe (`/-/ready`, `/-/healthy`)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Error, Result};

/// Default probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Readiness and health checks against the monitoring backend
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Status code of the readiness endpoint
    async fn ready(&self, ctx: &CancellationToken) -> Result<StatusCode>;

    /// Status code of the health endpoint
    async fn healthy(&self, ctx: &CancellationToken) -> Result<StatusCode>;
}

/// HTTP client for the Prometheus management API
#[derive(Debug, Clone)]
pub struct ManagementClient {
    client: Client,
    base: String,
}

impl ManagementClient {
    /// Create a probe with the default 5 s timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_PROBE_TIMEOUT)
    }

    /// Create a probe with a custom request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn probe(&self, ctx: &CancellationToken, endpoint: &str) -> Result<StatusCode> {
        let url = format!("{}/-/{endpoint}", self.base);
        debug!(url = %url, "Management probe");

        let request = self.client.get(&url).send();
        let response = tokio::select! {
            biased;
            () = ctx.cancelled() => return Err(Error::Cancelled),
            response = request => response,
        };

        match response {
            Ok(response) => Ok(response.status()),
            Err(e) if e.is_timeout() => Err(Error::BackendTimeout(e.to_string())),
            Err(e) => Err(Error::Http(e)),
        }
    }
}

#[async_trait]
impl ReadinessProbe for ManagementClient {
    async fn ready(&self, ctx: &CancellationToken) -> Result<StatusCode> {
        self.probe(ctx, "ready").await
    }

    async fn healthy(&self, ctx: &CancellationToken) -> Result<StatusCode> {
        self.probe(ctx, "healthy").await
    }
}
