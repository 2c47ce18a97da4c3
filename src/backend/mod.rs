//! Prometheus HTTP API surface used by the tools
//!
//! [`PrometheusApi`] has one method per API v1 operation the tools need. The
//! reqwest implementation lives in [`client`]; tests substitute their own.

mod client;

pub use client::HttpPrometheusClient;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;
use crate::promtime::Timestamp;

/// Label holding the metric name
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Optional evaluation controls shared by query-style operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Server-side evaluation timeout
    pub timeout: Option<Duration>,
    /// Maximum number of returned series
    pub limit: Option<u64>,
}

/// Range query window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    /// Start timestamp (inclusive)
    pub start: Timestamp,
    /// End timestamp (inclusive)
    pub end: Timestamp,
    /// Resolution step width
    pub step: Duration,
}

/// Instant query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantQuery {
    /// PromQL expression
    pub query: String,
    /// Evaluation time; Prometheus uses "now" when unset
    pub time: Option<Timestamp>,
    /// Evaluation options
    pub options: QueryOptions,
}

/// Range query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    /// PromQL expression
    pub query: String,
    /// Evaluation window
    pub range: Range,
    /// Evaluation options
    pub options: QueryOptions,
}

/// Series lookup parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesQuery {
    /// Series selectors, sent as repeated `match[]`
    pub matchers: Vec<String>,
    /// Start timestamp
    pub start: Timestamp,
    /// End timestamp
    pub end: Timestamp,
    /// Lookup options
    pub options: QueryOptions,
}

/// Exemplar query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExemplarQuery {
    /// PromQL expression
    pub query: String,
    /// Start timestamp
    pub start: Timestamp,
    /// End timestamp
    pub end: Timestamp,
}

/// Successful API response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    /// The `data` member, untouched
    pub data: Value,
    /// Non-fatal warnings attached by Prometheus
    pub warnings: Vec<String>,
}

impl ApiResponse {
    /// Response without warnings
    #[must_use]
    pub fn new(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
        }
    }
}

/// Prometheus HTTP API v1 operations
#[async_trait]
pub trait PrometheusApi: Send + Sync {
    /// `GET /api/v1/alertmanagers`
    async fn alert_managers(&self) -> Result<ApiResponse>;

    /// `GET /api/v1/alerts`
    async fn alerts(&self) -> Result<ApiResponse>;

    /// `GET /api/v1/query_exemplars`
    async fn query_exemplars(&self, query: ExemplarQuery) -> Result<ApiResponse>;

    /// `GET /api/v1/label/{label}/values`
    async fn label_values(&self, label: &str) -> Result<ApiResponse>;

    /// `GET /api/v1/query`
    async fn query(&self, query: InstantQuery) -> Result<ApiResponse>;

    /// `GET /api/v1/query_range`
    async fn query_range(&self, query: RangeQuery) -> Result<ApiResponse>;

    /// `GET /api/v1/rules`
    async fn rules(&self) -> Result<ApiResponse>;

    /// `GET /api/v1/series`
    async fn series(&self, query: SeriesQuery) -> Result<ApiResponse>;

    /// `GET /api/v1/status/tsdb`
    async fn tsdb(&self) -> Result<ApiResponse>;

    /// `GET /api/v1/targets`
    async fn targets(&self) -> Result<ApiResponse>;
}
