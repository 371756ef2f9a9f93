//! JSON-RPC 2.0 wire shapes and the transport capability an A2A provider
//! is called through (spec.md §6 "A2A JSON-RPC").

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("json-rpc error {code}: {message}")]
pub struct JsonRpcError {
    /// The JSON-RPC error code, e.g. `-32602`.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured error data.
    pub data: Option<Value>,
}

/// `Invalid params`, per the JSON-RPC 2.0 spec.
pub const CODE_INVALID_PARAMS: i64 = -32602;
/// `Method not found`, per the JSON-RPC 2.0 spec.
pub const CODE_METHOD_NOT_FOUND: i64 = -32601;

/// A remote `tasks/send` call and its transport. Implemented once per
/// concrete transport (stream bus, HTTP, stdio); the federation layer
/// never depends on a specific one (spec.md §1 Non-goals).
#[async_trait]
pub trait A2ATransport: Send + Sync {
    /// Send `method` with `params` to the provider identified by `url`
    /// and return its JSON-RPC result or error.
    async fn call(&self, url: &str, method: &str, params: Value) -> Result<Value, JsonRpcError>;
}
