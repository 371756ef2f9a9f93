//! Bit-exact JSON wire messages exchanged over the stream bus (spec.md §6).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata carried alongside a tool call so the provider can reconstruct
/// routing context without decoding the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallMeta {
    /// The run this call belongs to.
    pub run_id: String,
    /// The session this call belongs to.
    pub session_id: String,
    /// The turn this call was issued in.
    pub turn_id: String,
    /// Deterministic identifier for this call.
    pub tool_call_id: String,
    /// The call that caused this one, if nested.
    pub parent_tool_call_id: Option<String>,
}

/// A tool call published on `toolset:<name>:requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolsetMessage {
    /// A call for the provider to execute.
    Call {
        /// Gateway-assigned identifier for this tool use.
        tool_use_id: String,
        /// Dotted tool identifier, e.g. `svc.ts.tool`.
        tool: String,
        /// Canonical JSON payload.
        payload: Value,
        /// Routing metadata.
        meta: CallMeta,
        /// W3C `traceparent` header value, if tracing is active.
        traceparent: Option<String>,
        /// W3C `tracestate` header value.
        tracestate: Option<String>,
        /// W3C `baggage` header value.
        baggage: Option<String>,
    },
    /// A liveness probe every registered toolset must answer.
    Ping {
        /// Identifier correlating this ping with its pong.
        ping_id: String,
    },
}

/// An artifact attached to a tool result (e.g. a sidecar rendering hint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultArtifact {
    /// Kind of artifact, e.g. `"sidecar"`.
    pub kind: String,
    /// Artifact payload bytes, base64 or raw JSON depending on `kind`.
    pub data: Value,
}

/// A structured provider-side error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultError {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// A tool result published on `result:<tool_use_id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultMessage {
    /// Identifier of the call this result answers.
    pub tool_use_id: String,
    /// Canonical JSON result bytes, absent on error.
    pub result_json: Option<Value>,
    /// Artifacts attached to this result.
    #[serde(default)]
    pub artifacts: Vec<ResultArtifact>,
    /// Structured error, present only on failure.
    pub error: Option<ResultError>,
}

/// A provider's response to a [`ToolsetMessage::Ping`], written to the
/// shared health map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pong {
    /// Identifier correlating this pong with its ping.
    pub ping_id: String,
}
