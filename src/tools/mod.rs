//! Tool adapter core
//!
//! Descriptors, typed argument extraction, the shared invocation pipeline and
//! the Prometheus and management tool sets.

pub mod args;
mod error;
mod management;
mod observer;
mod pipeline;
mod prometheus;
mod registry;

pub use args::{Arguments, ExtractionError, extract_options};
pub use error::{CallResult, ToolError, ToolFailure};
pub use management::{ManagementTools, PING};
pub use observer::Observer;
pub use pipeline::{JsonEncoder, Pipeline, ResultEncoder};
pub use prometheus::{PrometheusTools, QueryTool};
pub use registry::{ParamKind, ParamSpec, RegisteredTool, ToolDescriptor, ToolHandler, ToolRegistry};

use std::sync::Arc;

use crate::Result;
use crate::backend::PrometheusApi;
use crate::management::ReadinessProbe;
use crate::metrics::MetricsSink;

/// Build the full registry: query tools first, then management tools.
pub fn build_registry(
    api: Arc<dyn PrometheusApi>,
    probe: Arc<dyn ReadinessProbe>,
    sink: Arc<dyn MetricsSink>,
) -> Result<ToolRegistry> {
    build_registry_with_encoder(api, probe, sink, Arc::new(JsonEncoder))
}

/// [`build_registry`] with a custom result encoder
pub fn build_registry_with_encoder(
    api: Arc<dyn PrometheusApi>,
    probe: Arc<dyn ReadinessProbe>,
    sink: Arc<dyn MetricsSink>,
    encoder: Arc<dyn ResultEncoder>,
) -> Result<ToolRegistry> {
    let observer = Observer::new(sink);
    let query = Arc::new(PrometheusTools::new(
        api,
        Pipeline::with_encoder(observer.clone(), encoder),
    ));
    let management = Arc::new(ManagementTools::new(probe, observer));

    ToolRegistry::concat([query.registry(), management.registry()])
}
