//! Out-of-band signals delivered to a run while it executes (spec.md §4.10
//! "Signals").

use agent_core::ToolResult;
use serde_json::Value;

/// One of the five signals a caller may deliver to a running workflow.
/// Delivered over an `mpsc` channel rather than `Engine::signal_workflow`
/// directly, so the same loop runs identically atop an in-memory engine
/// or a durable one.
#[derive(Debug, Clone)]
pub enum Signal {
    /// Pause the run before its next turn begins.
    Pause,
    /// Resume a paused run.
    Resume,
    /// Cancel the run; it ends with `RunOutcome::Cancelled`.
    Cancel,
    /// Answer an `AwaitKind::Clarification` pause.
    ProvideClarification(Value),
    /// Answer an `AwaitKind::ExternalTools` pause.
    ProvideToolResults(Vec<ToolResult>),
}
