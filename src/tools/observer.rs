//! Counting and logging of tool outcomes

use std::sync::Arc;

use tracing::error;

use super::error::{ToolError, ToolFailure};
use crate::metrics::MetricsSink;

/// Single point where invocations and failures are counted and logged
#[derive(Clone)]
pub struct Observer {
    sink: Arc<dyn MetricsSink>,
}

impl Observer {
    /// Create an observer writing to `sink`
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }

    /// Count one invocation of `tool`
    pub fn record_invocation(&self, tool: &str) {
        self.sink.increment_total(tool);
    }

    /// Count, log and wrap a failure of `tool`
    pub fn fail(
        &self,
        tool: &str,
        message: impl Into<String>,
        cause: impl Into<ToolError>,
    ) -> ToolFailure {
        let message = message.into();
        let cause = cause.into();

        self.sink.increment_error(tool);
        error!(tool = %tool, message = %message, cause = %cause, "Tool invocation failed");

        ToolFailure { message, cause }
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer").finish_non_exhaustive()
    }
}
