//! Management tools (`ping`)

use std::sync::Arc;

use futures::FutureExt;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::args::Arguments;
use super::error::{CallResult, ToolError};
use super::observer::Observer;
use super::registry::{RegisteredTool, ToolDescriptor, ToolHandler};
use crate::management::ReadinessProbe;

/// Name of the readiness tool
pub const PING: &str = "ping";

/// Tools backed by the Prometheus management API
#[derive(Clone)]
pub struct ManagementTools {
    probe: Arc<dyn ReadinessProbe>,
    observer: Observer,
}

impl ManagementTools {
    /// Create the tool set
    pub fn new(probe: Arc<dyn ReadinessProbe>, observer: Observer) -> Self {
        Self { probe, observer }
    }

    /// Descriptors of every management tool
    #[must_use]
    pub fn descriptors() -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new(PING, "Ping the Prometheus server")]
    }

    /// Bind every management tool to its handler
    pub fn registry(self: &Arc<Self>) -> Vec<RegisteredTool> {
        let tools = Arc::clone(self);
        let handler: ToolHandler = Arc::new(move |ctx: CancellationToken, args: Arguments| {
            let tools = Arc::clone(&tools);
            async move { tools.ping(&ctx, &args).await }.boxed()
        });

        Self::descriptors()
            .into_iter()
            .map(|descriptor| RegisteredTool::new(descriptor, Arc::clone(&handler)))
            .collect()
    }

    /// Readiness check; `"OK"` when Prometheus answers 200
    pub async fn ping(&self, ctx: &CancellationToken, _args: &Arguments) -> CallResult {
        debug!(tool = PING, "Invoking tool");
        self.observer.record_invocation(PING);

        let status = self.probe.ready(ctx).await.map_err(|e| {
            self.observer
                .fail(PING, "unable to ping Prometheus", ToolError::Probe(e.to_string()))
        })?;

        if status != StatusCode::OK {
            return Err(self.observer.fail(
                PING,
                "Prometheus server is not ready",
                ToolError::Probe(format!("readiness returned {status}")),
            ));
        }

        Ok("OK".to_string())
    }
}

impl std::fmt::Debug for ManagementTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementTools")
            .field("observer", &self.observer)
            .finish_non_exhaustive()
    }
}
