//! Tool results and their workflow-boundary envelope (spec.md §3, §4.6).

use crate::id::{RunId, ToolCallId};
use crate::identifier::Identifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum canonical-JSON size of a decoded result allowed to cross the
/// workflow boundary before it is omitted from the planner-facing
/// envelope (spec.md §4.6).
pub const PLANNER_ENVELOPE_BUDGET_BYTES: usize = 64 * 1024;

/// Reason a `RetryHint` is attached to an error result, used by the
/// planner to decide whether and how to retry.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RetryReason {
    /// Payload failed schema validation or codec decoding; the planner
    /// should retry with corrected arguments.
    InvalidArguments,
    /// The target tool or toolset is not currently reachable.
    ToolUnavailable,
    /// Denied by an allow-tags or restrict-to-tool policy.
    PolicyDenied,
}

/// Structural guidance for the planner's next attempt, distinct from any
/// transport-level retry already performed internally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryHint {
    /// Why a retry is being suggested.
    pub reason: RetryReason,
    /// When set, the planner's next turn is restricted to this tool only.
    pub restrict_to_tool: Option<Identifier>,
    /// A repair prompt, e.g. containing the payload schema and an example.
    pub message: String,
}

/// A windowed view over a larger dataset (spec.md Glossary: Bounded result).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Number of items actually returned.
    pub returned: usize,
    /// Whether the underlying dataset was truncated to produce `returned`.
    pub truncated: bool,
    /// Total number of items available, if known.
    pub total: Option<usize>,
    /// Hint for how the caller could narrow the query to see more.
    pub refinement_hint: Option<String>,
}

/// Usage/latency telemetry attached to a tool result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Telemetry {
    /// Wall-clock duration of the call, in milliseconds.
    pub duration_ms: u64,
    /// True if the call was served by a remote provider via the gateway.
    pub via_gateway: bool,
}

/// A structured tool-scope error (spec.md §7: validation, transport,
/// policy, or provider error kinds all normalise to this shape).
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ToolErrorInfo {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// The outcome of one tool call, decoded for in-process consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The tool that was invoked.
    pub name: Identifier,
    /// The call this result answers.
    pub tool_call_id: ToolCallId,
    /// The decoded result value, absent when omitted.
    pub result: Option<Value>,
    /// Canonical-JSON byte length of the (possibly omitted) result.
    pub result_bytes: usize,
    /// True if `result` was dropped from this envelope for size reasons.
    pub result_omitted: bool,
    /// Why the result was omitted, e.g. `"workflow_budget"`.
    pub result_omitted_reason: Option<String>,
    /// Raw server-side metadata bytes, opaque to the planner.
    pub server_data: Option<Vec<u8>>,
    /// Sidecar artifact for UI rendering; never forwarded to model providers.
    pub sidecar: Option<Value>,
    /// Windowing metadata when the tool's spec marks `bounded_result`.
    pub bounds: Option<Bounds>,
    /// Structured error, present only on failure.
    pub error: Option<ToolErrorInfo>,
    /// Structural retry guidance for the planner, present only on failure.
    pub retry_hint: Option<RetryHint>,
    /// Telemetry for this call.
    pub telemetry: Option<Telemetry>,
    /// Number of nested tool calls this call fanned out into, if any.
    pub children_count: usize,
    /// For inline-agent tool calls, the nested run this result came from.
    pub run_link: Option<RunId>,
}

impl ToolResult {
    /// True if this result represents a failed call.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// The workflow-boundary envelope of a [`ToolResult`]: identical fields,
/// but `result` is carried as canonical JSON bytes rather than a decoded
/// value, so no type fidelity is lost crossing the boundary (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEvent {
    /// The tool that was invoked.
    pub name: Identifier,
    /// The call this event answers.
    pub tool_call_id: ToolCallId,
    /// Canonical JSON bytes of the result, absent when omitted.
    pub result_json: Option<Vec<u8>>,
    /// Canonical-JSON byte length of the (possibly omitted) result.
    pub result_bytes: usize,
    /// True if `result_json` was dropped from this envelope for size reasons.
    pub result_omitted: bool,
    /// Why the result was omitted, e.g. `"workflow_budget"`.
    pub result_omitted_reason: Option<String>,
    /// Raw server-side metadata bytes, opaque to the planner.
    pub server_data: Option<Vec<u8>>,
    /// Sidecar artifact bytes; never forwarded to model providers.
    pub sidecar: Option<Vec<u8>>,
    /// Windowing metadata when the tool's spec marks `bounded_result`.
    pub bounds: Option<Bounds>,
    /// Structured error, present only on failure.
    pub error: Option<ToolErrorInfo>,
    /// Structural retry guidance for the planner, present only on failure.
    pub retry_hint: Option<RetryHint>,
    /// Telemetry for this call.
    pub telemetry: Option<Telemetry>,
    /// Number of nested tool calls this call fanned out into, if any.
    pub children_count: usize,
    /// For inline-agent tool calls, the nested run this event came from.
    pub run_link: Option<RunId>,
}

impl ToolEvent {
    /// Build the boundary envelope for a [`ToolResult`], omitting the
    /// decoded result in favour of its canonical JSON encoding, and
    /// applying the 64 KiB planner-envelope budget (spec.md §4.6).
    #[must_use]
    pub fn from_result(result: &ToolResult, encoded: Vec<u8>) -> Self {
        let oversized = encoded.len() > PLANNER_ENVELOPE_BUDGET_BYTES;
        let (result_json, result_omitted, result_omitted_reason) = if oversized {
            (None, true, Some("workflow_budget".to_string()))
        } else {
            (Some(encoded.clone()), result.result_omitted, result.result_omitted_reason.clone())
        };
        Self {
            name: result.name.clone(),
            tool_call_id: result.tool_call_id.clone(),
            result_json,
            result_bytes: encoded.len(),
            result_omitted,
            result_omitted_reason,
            server_data: result.server_data.clone(),
            sidecar: result.sidecar.as_ref().map(|s| s.to_string().into_bytes()),
            bounds: result.bounds.clone(),
            error: result.error.clone(),
            retry_hint: result.retry_hint.clone(),
            telemetry: result.telemetry.clone(),
            children_count: result.children_count,
            run_link: result.run_link.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{RunId, TurnId};

    fn sample_result(result_bytes: usize) -> ToolResult {
        ToolResult {
            name: Identifier::parse("svc.ts.echo").unwrap(),
            tool_call_id: ToolCallId::derive(&RunId::new("r1"), &TurnId::new("t1"), "svc.ts.echo", 0),
            result: Some(Value::String("x".repeat(result_bytes))),
            result_bytes,
            result_omitted: false,
            result_omitted_reason: None,
            server_data: None,
            sidecar: None,
            bounds: None,
            error: None,
            retry_hint: None,
            telemetry: None,
            children_count: 0,
            run_link: None,
        }
    }

    #[test]
    fn oversized_results_are_omitted_at_the_boundary() {
        let result = sample_result(10);
        let big_encoded = vec![0u8; PLANNER_ENVELOPE_BUDGET_BYTES + 1];
        let event = ToolEvent::from_result(&result, big_encoded);
        assert!(event.result_omitted);
        assert_eq!(event.result_omitted_reason.as_deref(), Some("workflow_budget"));
        assert!(event.result_json.is_none());
    }

    #[test]
    fn small_results_pass_through_undisturbed() {
        let result = sample_result(10);
        let small_encoded = br#""ok""#.to_vec();
        let event = ToolEvent::from_result(&result, small_encoded.clone());
        assert!(!event.result_omitted);
        assert_eq!(event.result_json, Some(small_encoded));
    }
}
