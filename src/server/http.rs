//! JSON-RPC over HTTP POST

use std::net::SocketAddr;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::McpServer;
use crate::{Error, Result};

/// Build the HTTP router: `POST {path}` for JSON-RPC, `GET /health` for liveness
pub fn create_router(server: McpServer, path: &str) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(path, post(rpc_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn rpc_handler(State(server): State<McpServer>, body: Bytes) -> Response {
    match server.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// MCP server bound to a TCP address
#[derive(Debug)]
pub struct HttpServer {
    server: McpServer,
    path: String,
}

impl HttpServer {
    /// Serve `server` under `path`
    pub fn new(server: McpServer, path: impl Into<String>) -> Self {
        Self {
            server,
            path: path.into(),
        }
    }

    /// Listen on `addr` until the server's shutdown token is cancelled
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let shutdown = self.server.shutdown_token().clone();
        let app = create_router(self.server, &self.path);

        let listener = TcpListener::bind(addr).await?;
        info!(addr = %addr, path = %self.path, "Serving MCP over HTTP");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| Error::Internal(e.to_string()))
    }
}
