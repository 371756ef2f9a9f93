//! Configuration applied to every run a [`crate::workflow::WorkflowLoop`]
//! drives (spec.md §4.5, §4.10; SPEC_FULL.md §1 "Configuration").

use agent_core::budget::Budgets;
use agent_core::identifier::Identifier;
use agent_reminders::Reminder;
use serde::{Deserialize, Serialize};

/// Per-turn and per-run policy plus the advertised-tool filter applied
/// before each planner call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Caps enforced by the policy layer (spec.md §4.5).
    pub budgets: Budgets,
    /// If set, only tools carrying at least one of these tags are
    /// advertised to the planner.
    pub allowed_tags: Option<Vec<String>>,
    /// Tools excluded from the advertised set regardless of tags.
    #[serde(default)]
    pub denied_tools: Vec<Identifier>,
    /// If set, the planner is restricted to calling only this tool and
    /// `tool_choice` is forced to `Required`.
    pub restrict_to_tool: Option<Identifier>,
    /// Execute a turn's tool calls concurrently rather than sequentially.
    pub parallel_tool_execution: bool,
    /// Reminder definitions injected into the planner input by attachment
    /// point (spec.md §4.4).
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}
