//! Step-by-step driving of a [`WorkflowLoop`], for callers that want to
//! interleave their own signal delivery between turns rather than block
//! inside `run()` (SPEC_FULL.md supplemented feature, mirroring the
//! blocking/non-blocking split spec.md keeps implicit in §4.10).

use crate::error::LoopError;
use crate::workflow::{RunCursor, TurnOutcome, WorkflowLoop};
use agent_core::id::{AgentId, RunId, SessionId};
use agent_core::plan::{AwaitKind, Message};
use agent_core::run::RunOutput;
use agent_core::ToolResult;
use agent_reminders::Attachment;
use tokio_util::sync::CancellationToken;

/// What one `StepIterator::next` call produced.
#[derive(Debug)]
pub enum StepResult {
    /// The run advanced one turn and is not yet finished.
    Advanced,
    /// The planner paused; call `resume_with_clarification` or
    /// `resume_with_tool_results` before the next `next()` call.
    Paused(AwaitKind),
    /// The run reached a terminal state; no further calls are valid.
    Finished(RunOutput),
}

/// Drives a [`WorkflowLoop`] one turn at a time.
pub struct StepIterator<'a> {
    workflow: &'a mut WorkflowLoop,
    cursor: RunCursor,
    cancellation: CancellationToken,
    pending_await: Option<AwaitKind>,
}

impl<'a> StepIterator<'a> {
    /// Start a new run in step mode.
    #[must_use]
    pub fn new(
        workflow: &'a mut WorkflowLoop,
        run_id: RunId,
        session_id: SessionId,
        agent_id: AgentId,
        user_message: Message,
        cancellation: CancellationToken,
    ) -> Self {
        let cursor = RunCursor::new(run_id, session_id, agent_id, user_message, workflow.budgets());
        Self { workflow, cursor, cancellation, pending_await: None }
    }

    /// Advance the run by one turn. Returns `Paused` without blocking if
    /// the planner is waiting on external input; the caller must resolve
    /// it with one of the `resume_*` methods first.
    pub async fn next(&mut self) -> Result<StepResult, LoopError> {
        if let Some(kind) = &self.pending_await {
            return Ok(StepResult::Paused(kind.clone()));
        }
        match self.workflow.advance(&mut self.cursor, &self.cancellation).await? {
            TurnOutcome::Continue => Ok(StepResult::Advanced),
            TurnOutcome::Terminal(output) => Ok(StepResult::Finished(output)),
            TurnOutcome::Paused(kind) => {
                self.pending_await = Some(kind.clone());
                Ok(StepResult::Paused(kind))
            }
        }
    }

    /// Resolve a pending `Clarification` pause.
    pub fn resume_with_clarification(&mut self, payload: serde_json::Value) {
        self.cursor.messages.push(Message { role: "user".to_string(), content: payload });
        self.cursor.next_attachment = Attachment::UserTurn;
        self.pending_await = None;
    }

    /// Resolve a pending `ExternalTools` pause.
    pub fn resume_with_tool_results(&mut self, results: Vec<ToolResult>) -> Result<(), LoopError> {
        self.workflow.absorb_tool_results(&mut self.cursor, &[], results)?;
        self.cursor.next_attachment = Attachment::ToolTurn;
        self.pending_await = None;
        Ok(())
    }

    /// Deliver a cancellation signal, observed on the next `next()` call.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// True if a pause is currently outstanding.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pending_await.is_some()
    }
}
