//! The ordered parts that make up a [`crate::Ledger`] (spec.md §3
//! "Transcript Entry").

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in the transcript, in the order it was appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    /// A chain-of-thought fragment from the model.
    Thinking {
        /// The thinking text.
        text: String,
        /// Provider-issued signature for replay validation, if any.
        signature: Option<String>,
        /// Position of this fragment within a single thinking block.
        index: usize,
        /// True if this is the last fragment of its thinking block.
        r#final: bool,
    },
    /// Plain assistant text, not part of a thinking block.
    AssistantText {
        /// The text content.
        text: String,
    },
    /// A tool-use request declared by the planner.
    ToolUse {
        /// The tool-use identifier (matches a later `ToolResult.id`).
        id: String,
        /// Name of the tool invoked.
        name: String,
        /// Arguments passed to the tool, as decoded JSON.
        args: Value,
    },
    /// The result of a previously declared tool use.
    ToolResult {
        /// The `ToolUse.id` this result answers.
        id: String,
        /// Result content rendered for the provider.
        content: String,
        /// Whether the tool call failed.
        is_error: bool,
    },
}

impl Part {
    /// The `ToolUse`/`ToolResult` id this part carries, if any.
    #[must_use]
    pub fn tool_id(&self) -> Option<&str> {
        match self {
            Part::ToolUse { id, .. } | Part::ToolResult { id, .. } => Some(id),
            Part::Thinking { .. } | Part::AssistantText { .. } => None,
        }
    }
}
