//! MCP JSON-RPC server over the tool registry

mod http;
mod stdio;

pub use http::{HttpServer, create_router};
pub use stdio::serve_stdio;

use std::sync::Arc;

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::rpc_codes;
use crate::protocol::{
    Info, InitializeResult, JsonRpcResponse, RequestId, ServerCapabilities, ToolsCallParams,
    ToolsCallResult, ToolsCapability, ToolsListResult, negotiate_version,
};
use crate::tools::{Arguments, ToolRegistry};
use crate::{Error, Result};

/// Server name reported in `initialize`
pub const SERVER_NAME: &str = "prometheus-mcp";

/// Dispatches MCP requests to the tool registry
#[derive(Debug, Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    shutdown: CancellationToken,
}

impl McpServer {
    /// Create a server; in-flight calls are cancelled with `shutdown`
    pub fn new(registry: Arc<ToolRegistry>, shutdown: CancellationToken) -> Self {
        Self { registry, shutdown }
    }

    /// Tool registry
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Shutdown token
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Handle one raw JSON-RPC line or body.
    ///
    /// Returns `None` for notifications.
    pub async fn handle_message(&self, raw: &[u8]) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_slice(raw) {
            Ok(v) => v,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    None,
                    rpc_codes::PARSE_ERROR,
                    format!("Invalid JSON: {e}"),
                ));
            }
        };
        self.handle_value(&value).await
    }

    /// Handle one parsed JSON-RPC message
    pub async fn handle_value(&self, value: &Value) -> Option<JsonRpcResponse> {
        let (id, method, params) = match parse_request(value) {
            Ok(parsed) => parsed,
            Err(response) => return Some(response),
        };

        let Some(id) = id else {
            debug!(method = %method, "Notification received");
            return None;
        };

        Some(self.handle_request(id, &method, params.as_ref()).await)
    }

    /// Handle a request that expects a response
    pub async fn handle_request(
        &self,
        id: RequestId,
        method: &str,
        params: Option<&Value>,
    ) -> JsonRpcResponse {
        debug!(id = %id, method = %method, "Request received");
        match method {
            "initialize" => handle_initialize(id, params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, params).await,
            _ => JsonRpcResponse::error(
                Some(id),
                rpc_codes::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            ),
        }
    }

    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.registry.list_tools(),
            next_cursor: None,
        };
        to_response(id, &result)
    }

    async fn handle_tools_call(&self, id: RequestId, params: Option<&Value>) -> JsonRpcResponse {
        match self.call_tool(params).await {
            Ok(result) => to_response(id, &result),
            Err(e) => error_response(Some(id), &e),
        }
    }

    async fn call_tool(&self, params: Option<&Value>) -> Result<ToolsCallResult> {
        let params = params
            .ok_or_else(|| Error::json_rpc(rpc_codes::INVALID_PARAMS, "Missing tools/call params"))?;
        let params: ToolsCallParams = serde_json::from_value(params.clone()).map_err(|e| {
            Error::json_rpc(
                rpc_codes::INVALID_PARAMS,
                format!("Invalid tools/call params: {e}"),
            )
        })?;

        let tool = self.registry.get(&params.name).ok_or_else(|| {
            Error::json_rpc(
                rpc_codes::INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            )
        })?;

        let arguments = Arguments::from_value(params.arguments).ok_or_else(|| {
            Error::json_rpc(rpc_codes::INVALID_PARAMS, "Tool arguments must be an object")
        })?;

        Ok(match tool.call(self.shutdown.child_token(), arguments).await {
            Ok(text) => ToolsCallResult::text(text),
            Err(failure) => ToolsCallResult::error(failure.message),
        })
    }
}

fn error_response(id: Option<RequestId>, err: &Error) -> JsonRpcResponse {
    let message = match err {
        Error::JsonRpc { message, .. } => message.clone(),
        other => other.to_string(),
    };
    JsonRpcResponse::error(id, err.to_rpc_code(), message)
}

fn to_response<T: serde::Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            warn!(error = %e, "Failed to serialize result");
            error_response(Some(id), &Error::Internal(e.to_string()))
        }
    }
}

fn handle_initialize(id: RequestId, params: Option<&Value>) -> JsonRpcResponse {
    let requested = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let negotiated = negotiate_version(requested);
    debug!(
        client = requested,
        negotiated = negotiated,
        "Protocol version negotiation"
    );

    let result = InitializeResult {
        protocol_version: negotiated.to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: false,
            }),
        },
        server_info: Info {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("Prometheus MCP Server".to_string()),
        },
        instructions: Some(
            "Query a Prometheus server: run PromQL with `query`/`query_range`, \
             browse `metrics`, `series`, `targets`, `rules` and `alerts`, \
             and check readiness with `ping`."
                .to_string(),
        ),
    };
    to_response(id, &result)
}

fn extract_request_id(value: &Value) -> Option<RequestId> {
    match value {
        Value::String(s) => Some(RequestId::String(s.clone())),
        Value::Number(n) => n.as_i64().map(RequestId::Number),
        _ => None,
    }
}

fn is_notification_method(method: &str) -> bool {
    method.starts_with("notifications/")
}

/// Parse a JSON-RPC request or notification into `(id, method, params)`
#[allow(clippy::result_large_err)]
fn parse_request(
    value: &Value,
) -> std::result::Result<(Option<RequestId>, String, Option<Value>), JsonRpcResponse> {
    if !value.is_object() {
        return Err(JsonRpcResponse::error(
            None,
            rpc_codes::INVALID_REQUEST,
            "Request must be an object",
        ));
    }

    let id = value.get("id").and_then(extract_request_id);

    if value.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(JsonRpcResponse::error(
            id,
            rpc_codes::INVALID_REQUEST,
            "Invalid JSON-RPC version",
        ));
    }

    let method = value
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            JsonRpcResponse::error(id.clone(), rpc_codes::INVALID_REQUEST, "Missing method")
        })?;

    if id.is_none() && !is_notification_method(method) {
        return Err(JsonRpcResponse::error(
            None,
            rpc_codes::INVALID_REQUEST,
            "Missing id",
        ));
    }

    Ok((id, method.to_string(), value.get("params").cloned()))
}
