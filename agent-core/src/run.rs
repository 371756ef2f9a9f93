//! Run state and terminal outcomes (spec.md §3, §7).

use crate::id::{AgentId, RunId, SessionId};
use crate::plan::{Message, Usage};
use crate::result::ToolEvent;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Current status of a run, mutated only by the workflow loop.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Actively planning or executing tools.
    Running,
    /// Paused awaiting a signal.
    Waiting,
    /// Reached a `FinalResponse`.
    Completed,
    /// Terminated by an engine or policy error.
    Failed,
    /// Terminated by explicit cancellation.
    Cancelled,
}

/// Persisted state of a run, observed externally via a `RunStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// The run's identifier.
    pub run_id: RunId,
    /// The agent executing this run.
    pub agent_id: AgentId,
    /// The session this run belongs to.
    pub session_id: SessionId,
    /// Current status.
    pub status: RunStatus,
    /// When the run started.
    pub started_at: SystemTime,
    /// When the run state was last mutated.
    pub updated_at: SystemTime,
    /// Cumulative token usage across all planner calls.
    pub usage: Usage,
    /// Number of completed planner turns.
    pub turn_count: usize,
}

/// Why a run ended, one of the five terminal outcomes named in spec.md §7.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RunOutcome {
    /// Reached a `FinalResponse`.
    Completed,
    /// Terminated by an engine or policy error.
    Failed,
    /// Terminated by explicit cancellation.
    Cancelled,
    /// Terminated because the time budget elapsed.
    TimedOut,
    /// Terminated because a tool-call or failure cap was exceeded.
    BudgetExceeded,
}

impl RunOutcome {
    /// Map this outcome onto the [`RunStatus`] it should leave the run in.
    #[must_use]
    pub fn into_status(self) -> RunStatus {
        match self {
            RunOutcome::Completed => RunStatus::Completed,
            RunOutcome::Cancelled => RunStatus::Cancelled,
            RunOutcome::Failed | RunOutcome::TimedOut | RunOutcome::BudgetExceeded => {
                RunStatus::Failed
            }
        }
    }
}

/// What a completed or terminated run hands back to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// The run this output belongs to.
    pub run_id: RunId,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// The final assistant message, absent in non-completed states.
    pub r#final: Option<Message>,
    /// All tool events produced over the life of the run, in emission order.
    pub tool_events: Vec<ToolEvent>,
    /// Cumulative token usage.
    pub usage: Usage,
    /// Non-fatal advisories accumulated during the run (e.g. a reminder
    /// that could not be attached, a sidecar that was dropped).
    pub notes: Vec<String>,
    /// Human-readable reason for the outcome, present when not `Completed`.
    pub reason: Option<String>,
}
