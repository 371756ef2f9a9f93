//! A request to execute one tool (spec.md §3).

use crate::id::{AgentId, RunId, SessionId, ToolCallId, TurnId};
use crate::identifier::Identifier;
use serde::{Deserialize, Serialize};

/// A single tool invocation, addressed by [`Identifier`] and carrying its
/// payload as canonical JSON bytes. `tool_call_id` is derived
/// deterministically from `(run_id, turn_id, name, sequence)` so replays
/// produce identical identifiers (spec.md §8 invariant 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    /// The tool being invoked.
    pub name: Identifier,
    /// Canonical JSON bytes of the tool's payload.
    pub payload: Vec<u8>,
    /// Deterministic identifier for this call.
    pub tool_call_id: ToolCallId,
    /// The run this call belongs to.
    pub run_id: RunId,
    /// The session this call belongs to.
    pub session_id: SessionId,
    /// The turn this call was issued in.
    pub turn_id: TurnId,
    /// The call that caused this one (inline-agent nesting), if any.
    pub parent_tool_call_id: Option<ToolCallId>,
    /// The agent that issued this call.
    pub agent_id: AgentId,
}
