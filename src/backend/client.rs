//! reqwest implementation of [`PrometheusApi`]

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{
    ApiResponse, ExemplarQuery, InstantQuery, PrometheusApi, QueryOptions, RangeQuery,
    SeriesQuery,
};
use crate::promtime::{format_duration, format_timestamp};
use crate::{Error, Result};

/// Longest slice of a non-JSON error body kept in error messages
const MAX_ERROR_BODY: usize = 512;

/// Response envelope shared by every `/api/v1` endpoint
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    data: Value,
    #[serde(rename = "errorType", default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

/// Prometheus HTTP API client
#[derive(Debug, Clone)]
pub struct HttpPrometheusClient {
    client: Client,
    base: String,
}

impl HttpPrometheusClient {
    /// Create a client for the Prometheus server at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("prometheus-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, base_url)
    }

    /// Create a client reusing an existing reqwest client
    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid Prometheus URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Unsupported Prometheus URL scheme: {}",
                parsed.scheme()
            )));
        }

        Ok(Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL, without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<ApiResponse> {
        let url = format!("{}/api/v1/{path}", self.base);
        debug!(url = %url, params = params.len(), "Prometheus API request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.bytes().await.map_err(classify)?;
        decode(status, &body)
    }
}

/// Map reqwest failures onto crate errors
fn classify(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::BackendTimeout(err.to_string())
    } else {
        Error::Http(err)
    }
}

/// Turn an HTTP status and body into an [`ApiResponse`] or a backend error
fn decode(status: StatusCode, body: &[u8]) -> Result<ApiResponse> {
    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(Error::Json(e)),
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            let message: String = text.chars().take(MAX_ERROR_BODY).collect();
            return Err(Error::Backend {
                status: status.as_u16(),
                message,
            });
        }
    };

    if envelope.status != "success" || !status.is_success() {
        let error_type = envelope.error_type.unwrap_or_else(|| "unknown".to_string());
        let error = envelope.error.unwrap_or_default();
        return Err(Error::Backend {
            status: status.as_u16(),
            message: format!("{error_type}: {error}"),
        });
    }

    Ok(ApiResponse {
        data: envelope.data,
        warnings: envelope.warnings,
    })
}

fn push_options(params: &mut Vec<(&str, String)>, options: QueryOptions) {
    if let Some(timeout) = options.timeout {
        params.push(("timeout", format_duration(timeout)));
    }
    if let Some(limit) = options.limit {
        params.push(("limit", limit.to_string()));
    }
}

#[async_trait]
impl PrometheusApi for HttpPrometheusClient {
    async fn alert_managers(&self) -> Result<ApiResponse> {
        self.get("alertmanagers", &[]).await
    }

    async fn alerts(&self) -> Result<ApiResponse> {
        self.get("alerts", &[]).await
    }

    async fn query_exemplars(&self, query: ExemplarQuery) -> Result<ApiResponse> {
        let params = [
            ("query", query.query),
            ("start", format_timestamp(&query.start)),
            ("end", format_timestamp(&query.end)),
        ];
        self.get("query_exemplars", &params).await
    }

    async fn label_values(&self, label: &str) -> Result<ApiResponse> {
        self.get(&format!("label/{label}/values"), &[]).await
    }

    async fn query(&self, query: InstantQuery) -> Result<ApiResponse> {
        let mut params = vec![("query", query.query)];
        if let Some(time) = query.time {
            params.push(("time", format_timestamp(&time)));
        }
        push_options(&mut params, query.options);
        self.get("query", &params).await
    }

    async fn query_range(&self, query: RangeQuery) -> Result<ApiResponse> {
        let mut params = vec![
            ("query", query.query),
            ("start", format_timestamp(&query.range.start)),
            ("end", format_timestamp(&query.range.end)),
            ("step", format_duration(query.range.step)),
        ];
        push_options(&mut params, query.options);
        self.get("query_range", &params).await
    }

    async fn rules(&self) -> Result<ApiResponse> {
        self.get("rules", &[]).await
    }

    async fn series(&self, query: SeriesQuery) -> Result<ApiResponse> {
        let mut params: Vec<(&str, String)> = query
            .matchers
            .into_iter()
            .map(|matcher| ("match[]", matcher))
            .collect();
        params.push(("start", format_timestamp(&query.start)));
        params.push(("end", format_timestamp(&query.end)));
        push_options(&mut params, query.options);
        self.get("series", &params).await
    }

    async fn tsdb(&self) -> Result<ApiResponse> {
        self.get("status/tsdb", &[]).await
    }

    async fn targets(&self) -> Result<ApiResponse> {
        self.get("targets", &[]).await
    }
}
