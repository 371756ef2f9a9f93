//! Append-only, replay-safe record of a run's conversation parts, and the
//! logic to render that record into provider-shaped messages (spec.md
//! §4.2).

#![deny(missing_docs)]

pub mod part;

use agent_core::plan::Message;
pub use part::Part;
use serde_json::{json, Value};
use tracing::debug;

/// Errors raised while appending to or validating a [`Ledger`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// A `ToolResult` was appended whose id has no prior `ToolUse`.
    #[error("tool result `{0}` has no matching tool use")]
    DanglingToolResult(String),
    /// A thinking part was appended twice with a different body at the
    /// same index.
    #[error("thinking index {index} appended twice with different content")]
    ConflictingThinking {
        /// The thinking index that conflicted.
        index: usize,
    },
    /// Any other validation failure, wrapping a foreign error.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Append-only transcript of one run's conversation parts.
///
/// The ledger never removes a part once appended; it is owned by the run
/// and copied across planner activity boundaries as immutable snapshots
/// (spec.md §3 "Ownership").
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    parts: Vec<Part>,
}

impl Ledger {
    /// Start an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a thinking fragment. Appending an identical fragment twice
    /// at the same `index` is a no-op; appending a *different* fragment
    /// at an already-used `index` is a [`LedgerError::ConflictingThinking`].
    pub fn append_thinking(
        &mut self,
        text: impl Into<String>,
        signature: Option<String>,
        index: usize,
        r#final: bool,
    ) -> Result<(), LedgerError> {
        let text = text.into();
        if let Some(existing) = self.parts.iter().find_map(|p| match p {
            Part::Thinking { text: t, index: i, .. } if *i == index => Some(t),
            _ => None,
        }) {
            if existing == &text {
                debug!(index, "duplicate identical thinking part, ignored");
                return Ok(());
            }
            return Err(LedgerError::ConflictingThinking { index });
        }
        self.parts.push(Part::Thinking { text, signature, index, r#final });
        Ok(())
    }

    /// Append plain assistant text.
    pub fn append_text(&mut self, text: impl Into<String>) {
        self.parts.push(Part::AssistantText { text: text.into() });
    }

    /// Declare a tool use the planner issued.
    pub fn declare_tool_use(&mut self, id: impl Into<String>, name: impl Into<String>, args: Value) {
        self.parts.push(Part::ToolUse { id: id.into(), name: name.into(), args });
    }

    /// Append the result of a previously declared tool use.
    pub fn append_tool_result(&mut self, id: impl Into<String>, content: impl Into<String>, is_error: bool) {
        self.parts.push(Part::ToolResult { id: id.into(), content: content.into(), is_error });
    }

    /// All parts appended so far, in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Check that the sequence is acceptable to strict providers: every
    /// `ToolResult.id` refers to a prior `ToolUse.id`, with no dangling
    /// results (spec.md §8 invariant 5).
    pub fn validate(&self) -> Result<(), LedgerError> {
        let mut declared = std::collections::HashSet::new();
        for part in &self.parts {
            match part {
                Part::ToolUse { id, .. } => {
                    declared.insert(id.clone());
                }
                Part::ToolResult { id, .. } => {
                    if !declared.contains(id) {
                        return Err(LedgerError::DanglingToolResult(id.clone()));
                    }
                }
                Part::Thinking { .. } | Part::AssistantText { .. } => {}
            }
        }
        Ok(())
    }

    /// Render the parts into alternating assistant/user messages,
    /// preserving insertion order. Thinking parts always precede
    /// tool-uses within the same assistant message (spec.md §4.2).
    #[must_use]
    pub fn build_messages(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        let mut current_role: Option<&str> = None;
        let mut current_content: Vec<Value> = Vec::new();

        let mut flush = |role: Option<&str>, content: &mut Vec<Value>| {
            if let Some(role) = role {
                if !content.is_empty() {
                    messages.push(Message { role: role.to_string(), content: json!(std::mem::take(content)) });
                }
            }
        };

        for part in &self.parts {
            let role = match part {
                Part::Thinking { .. } | Part::AssistantText { .. } | Part::ToolUse { .. } => "assistant",
                Part::ToolResult { .. } => "user",
            };
            if current_role != Some(role) {
                flush(current_role, &mut current_content);
                current_role = Some(role);
            }
            current_content.push(render_part(part));
        }
        flush(current_role, &mut current_content);
        messages
    }
}

fn render_part(part: &Part) -> Value {
    match part {
        Part::Thinking { text, signature, .. } => json!({
            "type": "thinking",
            "text": text,
            "signature": signature,
        }),
        Part::AssistantText { text } => json!({
            "type": "text",
            "text": text,
        }),
        Part::ToolUse { id, name, args } => json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": args,
        }),
        Part::ToolResult { id, content, is_error } => json!({
            "type": "tool_result",
            "tool_use_id": id,
            "content": content,
            "is_error": is_error,
        }),
    }
}
