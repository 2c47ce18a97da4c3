//! Tool failure types

use thiserror::Error;

use super::args::ExtractionError;

/// Outcome of a tool invocation: JSON text on success
pub type CallResult = std::result::Result<String, ToolFailure>;

/// What went wrong inside a tool
#[derive(Debug, Error)]
pub enum ToolError {
    /// Argument missing, malformed, or of the wrong shape
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Prometheus call failed or was cancelled
    #[error(transparent)]
    Backend(#[from] crate::Error),

    /// Result could not be encoded
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Management probe failed or reported not ready
    #[error("probe failed: {0}")]
    Probe(String),
}

/// Failed invocation as seen by the transport.
///
/// `message` is safe to return to the caller; `cause` is for logs only.
#[derive(Debug, Error)]
#[error("{message}: {cause}")]
pub struct ToolFailure {
    /// Short summary returned to the caller
    pub message: String,
    /// Underlying error
    #[source]
    pub cause: ToolError,
}
