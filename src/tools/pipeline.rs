//! The invocation pipeline shared by every Prometheus tool
//!
//! count → extract required → extract optional → call (cancellable) → encode

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::args::{Arguments, ExtractionError};
use super::error::{CallResult, ToolFailure};
use super::observer::Observer;
use crate::Error;
use crate::backend::ApiResponse;

/// Encodes backend `data` into the text payload of a tool result
pub trait ResultEncoder: Send + Sync {
    /// Encode `data`
    fn encode(&self, data: &Value) -> serde_json::Result<String>;
}

/// Compact JSON encoding
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEncoder;

impl ResultEncoder for JsonEncoder {
    fn encode(&self, data: &Value) -> serde_json::Result<String> {
        serde_json::to_string(data)
    }
}

/// Runs tool invocations through extraction, the backend call and encoding
#[derive(Clone)]
pub struct Pipeline {
    observer: Observer,
    encoder: Arc<dyn ResultEncoder>,
}

impl Pipeline {
    /// Pipeline with JSON encoding
    pub fn new(observer: Observer) -> Self {
        Self::with_encoder(observer, Arc::new(JsonEncoder))
    }

    /// Pipeline with a custom encoder
    pub fn with_encoder(observer: Observer, encoder: Arc<dyn ResultEncoder>) -> Self {
        Self { observer, encoder }
    }

    /// Run one invocation of `tool`.
    ///
    /// The total counter is bumped before anything else; every failure after
    /// that goes through [`Observer::fail`].
    pub async fn run<R, O, Fut>(
        &self,
        tool: &str,
        ctx: &CancellationToken,
        args: &Arguments,
        required: impl FnOnce(&Arguments) -> Result<R, ExtractionError>,
        optional: impl FnOnce(&Arguments) -> Result<O, ExtractionError>,
        call: impl FnOnce(R, O) -> Fut,
    ) -> CallResult
    where
        Fut: Future<Output = crate::Result<ApiResponse>>,
    {
        debug!(tool = %tool, "Invoking tool");
        self.observer.record_invocation(tool);

        let required = required(args).map_err(|e| self.extraction_failure(tool, e))?;
        let optional = optional(args).map_err(|e| self.extraction_failure(tool, e))?;

        let outcome = tokio::select! {
            biased;
            () = ctx.cancelled() => Err(Error::Cancelled),
            outcome = call(required, optional) => outcome,
        };
        let response = outcome
            .map_err(|e| self.observer.fail(tool, format!("unable to retrieve {tool}"), e))?;

        if !response.warnings.is_empty() {
            info!(tool = %tool, warnings = ?response.warnings, "Prometheus returned warnings");
        }
        info!(tool = %tool, summary = %summarize(&response.data), "Retrieved");

        self.encoder
            .encode(&response.data)
            .map_err(|e| self.observer.fail(tool, format!("unable to marshal {tool}"), e))
    }

    fn extraction_failure(&self, tool: &str, err: ExtractionError) -> ToolFailure {
        let message = format!("unable to extract '{}' parameter", err.field());
        self.observer.fail(tool, message, err)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("observer", &self.observer)
            .finish_non_exhaustive()
    }
}

/// Short description of a result for logging: list lengths, nothing else.
fn summarize(data: &Value) -> String {
    match data {
        Value::Array(items) => format!("items={}", items.len()),
        Value::Object(map) => {
            let counts: Vec<String> = map
                .iter()
                .filter_map(|(key, value)| value.as_array().map(|a| format!("{key}={}", a.len())))
                .collect();
            if counts.is_empty() {
                "object".to_string()
            } else {
                counts.join(" ")
            }
        }
        other => other.to_string(),
    }
}
