//! The planner's input/output contract (spec.md §3, §9 "Sum types for
//! planner results").

use crate::budget::Budgets;
use crate::id::AgentId;
use crate::identifier::Identifier;
use crate::request::ToolRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A reminder snippet injected into a planner input by the reminder
/// engine (full reminder configuration lives in `agent-reminders`; this
/// is the rendered form the planner sees).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedReminder {
    /// Identifier of the source reminder.
    pub id: String,
    /// Rendered text.
    pub text: String,
}

/// A single role-tagged message in the conversation payload handed to
/// the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// `"system"`, `"user"`, or `"assistant"`.
    pub role: String,
    /// Message content.
    pub content: Value,
}

/// Restricts which tools a planner may choose from on a given turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum ToolChoice {
    /// The planner may choose freely among advertised tools, or none.
    #[default]
    Auto,
    /// The planner must not call any tool this turn.
    None,
    /// The planner must call some tool this turn.
    Required,
}

/// Everything the planner needs to produce a [`PlanResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    /// The agent being planned for.
    pub agent: AgentId,
    /// Ledger-built conversation messages.
    pub messages: Vec<Message>,
    /// Specs of tools currently advertised to the planner.
    pub available_tools: Vec<Identifier>,
    /// How freely the planner may choose to call a tool.
    pub tool_choice: ToolChoice,
    /// When set, narrows `available_tools` to exactly one tool.
    pub restrict_to_tool: Option<Identifier>,
    /// Budgets in effect for this run.
    pub budgets: Budgets,
    /// Reminders injected for this turn.
    pub reminders: Vec<RenderedReminder>,
}

/// What kind of out-of-band input a paused run is waiting for.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum AwaitKind {
    /// Waiting for a `SignalProvideClarification`.
    Clarification,
    /// Waiting for a `SignalProvideToolResults`.
    ExternalTools,
}

/// Token/cost usage reported by a planner call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens produced.
    pub output_tokens: u64,
}

/// The planner's decision for one turn: exactly one of a final response,
/// a pause awaiting external input, or a batch of tool calls to execute.
///
/// This is a tagged variant, not a struct-of-options, so every call site
/// matches exhaustively rather than inferring the variant from which
/// optional field happens to be set (spec.md §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "decision_kind")]
pub enum PlanDecision {
    /// The planner is done; `text` is the assistant's final reply.
    FinalResponse {
        /// The final assistant message text.
        text: String,
    },
    /// The planner needs external input before continuing.
    Await {
        /// What kind of input is awaited.
        kind: AwaitKind,
    },
    /// The planner wants to execute these tool calls before continuing.
    ToolCalls {
        /// Requests in planner-issued order; this order must be preserved
        /// through execution and back (spec.md §8 invariant 3).
        calls: Vec<ToolRequest>,
    },
}

/// The full result of one planner call: the decision plus any
/// accompanying thinking trace, raw assistant text, and usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planner's decision for this turn.
    pub decision: PlanDecision,
    /// Chain-of-thought trace, when the model produced one.
    pub thinking: Option<String>,
    /// Raw assistant text accompanying a `ToolCalls` decision, if any.
    pub assistant_text: Option<String>,
    /// Token usage for this call.
    pub usage: Option<Usage>,
}
