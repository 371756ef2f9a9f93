//! Observability hooks fired at fixed points in the per-turn algorithm.
//!
//! Not named in spec.md's module list; added because a workflow loop
//! running unattended needs a way to observe and, rarely, interrupt its
//! own turns without the caller reimplementing the loop (SPEC_FULL.md
//! supplemented feature).

use agent_core::plan::{PlanInput, PlanResult};
use agent_core::{ToolRequest, ToolResult};
use async_trait::async_trait;

/// A point in the per-turn algorithm a hook may observe.
#[derive(Debug, Clone)]
pub enum HookEvent<'a> {
    /// Fired once at the top of every turn, before budget checks.
    LoopIteration {
        /// Turn number, zero-indexed.
        turn: usize,
    },
    /// Fired immediately before the planner is called.
    PreLlmCall {
        /// The input about to be sent to the planner.
        input: &'a PlanInput,
    },
    /// Fired immediately after the planner returns.
    PostLlmCall {
        /// The planner's decision for this turn.
        result: &'a PlanResult,
    },
    /// Fired before a single tool call is dispatched.
    PreToolExecution {
        /// The call about to be dispatched.
        request: &'a ToolRequest,
    },
    /// Fired after a single tool call completes.
    PostToolExecution {
        /// The call's result.
        result: &'a ToolResult,
    },
}

/// What a hook asks the loop to do in response to an event. Most hooks
/// return `Continue`; `Skip` and `Terminate` are only honoured at the
/// `PreToolExecution` and any point respectively.
#[derive(Debug, Clone)]
pub enum HookAction {
    /// Proceed normally.
    Continue,
    /// Skip the call this hook observed, synthesizing an error result
    /// instead of dispatching it. Only meaningful for `PreToolExecution`.
    Skip {
        /// Recorded as the synthesized error's message.
        reason: String,
    },
    /// End the run immediately with `RunOutcome::Failed`.
    Terminate {
        /// Recorded as the run's failure reason.
        reason: String,
    },
}

/// Observes and may steer a run's turns. Hooks run in registration order;
/// the first non-`Continue` action short-circuits the remaining hooks for
/// that event.
#[async_trait]
pub trait ObservabilityHook: Send + Sync {
    /// Handle one event, returning `None` to mean `Continue`.
    async fn on_event(&self, event: HookEvent<'_>) -> Option<HookAction>;
}
