// ABOUTME: Typed errors for the A2A HTTP client.
// ABOUTME: Separates transport, HTTP status, protocol, and JSON-RPC error responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error object carried by a JSON-RPC error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Error)]
#[error("JSON-RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Errors surfaced by [`crate::client::A2AClient`]
#[derive(Debug, Error)]
pub enum AgentError {
    /// Connection, TLS, timeout, or body read failure
    #[error("network error during {operation}: {source}")]
    Network {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("HTTP {status} from agent: {body}")]
    Http { status: u16, body: String },

    /// Response did not follow the expected protocol
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Response body or SSE frame was not valid JSON for the expected type
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The agent answered with a JSON-RPC error
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Bad client configuration (URL, headers)
    #[error("invalid client configuration: {0}")]
    Config(String),
}

pub type AgentResult<T> = std::result::Result<T, AgentError>;
