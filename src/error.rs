//! Error types for the Prometheus MCP server

use std::io;

use thiserror::Error;

/// Result type alias for the Prometheus MCP server
pub type Result<T> = std::result::Result<T, Error>;

/// Prometheus MCP server errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Prometheus returned an error envelope or a non-success status
    #[error("Backend error ({status}): {message}")]
    Backend {
        /// HTTP status code returned by Prometheus
        status: u16,
        /// `errorType: error` pair as reported by Prometheus
        message: String,
    },

    /// Backend timeout
    #[error("Backend timeout: {0}")]
    BackendTimeout(String),

    /// The invocation was cancelled before the backend answered
    #[error("Invocation cancelled")]
    Cancelled,

    /// JSON-RPC error
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc {
        /// Error code
        code: i32,
        /// Error message
        message: String,
        /// Optional data
        data: Option<serde_json::Value>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a JSON-RPC error
    pub fn json_rpc(code: i32, message: impl Into<String>) -> Self {
        Self::JsonRpc {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Convert to JSON-RPC error code
    #[must_use]
    pub fn to_rpc_code(&self) -> i32 {
        match self {
            Self::JsonRpc { code, .. } => *code,
            Self::Json(_) => rpc_codes::PARSE_ERROR,
            Self::Backend { .. } | Self::BackendTimeout(_) | Self::Transport(_) | Self::Http(_) => {
                rpc_codes::SERVER_ERROR_START
            }
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

/// Standard JSON-RPC error codes
pub mod rpc_codes {
    /// Parse error - Invalid JSON
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - Not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Implementation-defined server error
    pub const SERVER_ERROR_START: i32 = -32000;
}
