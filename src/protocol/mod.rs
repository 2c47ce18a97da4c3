//! MCP Protocol types

mod messages;
mod types;

pub use messages::*;
pub use types::*;

/// Latest MCP protocol version spoken by this server
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Protocol versions this server can negotiate, newest first
pub const SUPPORTED_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Pick the protocol version to answer an `initialize` with.
///
/// Echoes the client's version when supported, otherwise falls back to the
/// latest one.
#[must_use]
pub fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_VERSIONS
        .iter()
        .find(|v| **v == requested)
        .copied()
        .unwrap_or(PROTOCOL_VERSION)
}
