//! In-memory fakes shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use prometheus_mcp::backend::{
    ApiResponse, ExemplarQuery, InstantQuery, PrometheusApi, RangeQuery, SeriesQuery,
};
use prometheus_mcp::management::ReadinessProbe;
use prometheus_mcp::metrics::InMemorySink;
use prometheus_mcp::tools::{
    Arguments, JsonEncoder, ResultEncoder, ToolRegistry, build_registry_with_encoder,
};
use prometheus_mcp::{Error, Result};

/// A recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AlertManagers,
    Alerts,
    Exemplars(ExemplarQuery),
    LabelValues(String),
    Query(InstantQuery),
    QueryRange(RangeQuery),
    Rules,
    Series(SeriesQuery),
    Tsdb,
    Targets,
}

/// `PrometheusApi` that records calls and answers with a canned response
#[derive(Debug, Default)]
pub struct FakeApi {
    calls: Mutex<Vec<Call>>,
    data: Value,
    warnings: Vec<String>,
    failure: Option<(u16, String)>,
}

impl FakeApi {
    pub fn returning(data: Value) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            failure: Some((status, message.to_string())),
            ..Self::default()
        }
    }

    pub fn with_warnings(mut self, warnings: &[&str]) -> Self {
        self.warnings = warnings.iter().map(ToString::to_string).collect();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, call: Call) -> Result<ApiResponse> {
        self.calls.lock().unwrap().push(call);
        match &self.failure {
            Some((status, message)) => Err(Error::Backend {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(ApiResponse {
                data: self.data.clone(),
                warnings: self.warnings.clone(),
            }),
        }
    }
}

#[async_trait]
impl PrometheusApi for FakeApi {
    async fn alert_managers(&self) -> Result<ApiResponse> {
        self.respond(Call::AlertManagers)
    }

    async fn alerts(&self) -> Result<ApiResponse> {
        self.respond(Call::Alerts)
    }

    async fn query_exemplars(&self, query: ExemplarQuery) -> Result<ApiResponse> {
        self.respond(Call::Exemplars(query))
    }

    async fn label_values(&self, label: &str) -> Result<ApiResponse> {
        self.respond(Call::LabelValues(label.to_string()))
    }

    async fn query(&self, query: InstantQuery) -> Result<ApiResponse> {
        self.respond(Call::Query(query))
    }

    async fn query_range(&self, query: RangeQuery) -> Result<ApiResponse> {
        self.respond(Call::QueryRange(query))
    }

    async fn rules(&self) -> Result<ApiResponse> {
        self.respond(Call::Rules)
    }

    async fn series(&self, query: SeriesQuery) -> Result<ApiResponse> {
        self.respond(Call::Series(query))
    }

    async fn tsdb(&self) -> Result<ApiResponse> {
        self.respond(Call::Tsdb)
    }

    async fn targets(&self) -> Result<ApiResponse> {
        self.respond(Call::Targets)
    }
}

/// Probe answering with a fixed status, or failing outright
#[derive(Debug, Clone, Copy)]
pub struct FakeProbe {
    pub status: Option<StatusCode>,
}

impl FakeProbe {
    pub fn up() -> Self {
        Self {
            status: Some(StatusCode::OK),
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
        }
    }

    pub fn unreachable() -> Self {
        Self { status: None }
    }

    fn answer(self) -> Result<StatusCode> {
        self.status
            .ok_or_else(|| Error::Transport("connection refused".to_string()))
    }
}

#[async_trait]
impl ReadinessProbe for FakeProbe {
    async fn ready(&self, _ctx: &CancellationToken) -> Result<StatusCode> {
        self.answer()
    }

    async fn healthy(&self, _ctx: &CancellationToken) -> Result<StatusCode> {
        self.answer()
    }
}

/// Registry wired to fakes
pub struct Harness {
    pub api: Arc<FakeApi>,
    pub sink: Arc<InMemorySink>,
    pub registry: ToolRegistry,
}

impl Harness {
    pub fn new(api: FakeApi, probe: FakeProbe) -> Self {
        Self::with_encoder(api, probe, Arc::new(JsonEncoder))
    }

    pub fn with_encoder(api: FakeApi, probe: FakeProbe, encoder: Arc<dyn ResultEncoder>) -> Self {
        let api = Arc::new(api);
        let sink = Arc::new(InMemorySink::new());
        let registry =
            build_registry_with_encoder(api.clone(), Arc::new(probe), sink.clone(), encoder)
                .unwrap();
        Self {
            api,
            sink,
            registry,
        }
    }

    pub async fn call(&self, tool: &str, args: Value) -> prometheus_mcp::tools::CallResult {
        self.registry
            .call(tool, CancellationToken::new(), arguments(args))
            .await
            .expect("tool is registered")
    }
}

/// Build an argument bundle from a JSON object
pub fn arguments(value: Value) -> Arguments {
    match value {
        Value::Object(map) => Arguments::from(map),
        Value::Null => Arguments::from(Map::new()),
        other => panic!("arguments must be an object, got {other}"),
    }
}

/// Encoder that always fails
#[derive(Debug)]
pub struct FailingEncoder;

impl ResultEncoder for FailingEncoder {
    fn encode(&self, _data: &Value) -> serde_json::Result<String> {
        Err(<serde_json::Error as serde::ser::Error>::custom(
            "encoder exploded",
        ))
    }
}
