//! Errors surfaced by [`crate::workflow::WorkflowLoop::run`].

use agent_ledger::LedgerError;
use agent_runtime::{ModelClientError, StoreError};

/// Failure modes of the workflow loop itself, distinct from a run's
/// terminal [`agent_core::RunOutcome`] (a `RunOutcome` is not an error —
/// it is always returned inside `Ok`).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoopError {
    /// The planner call failed outright.
    #[error("planner call failed: {0}")]
    Planner(#[from] ModelClientError),
    /// The transcript ledger rejected an append or failed validation.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    /// A run or memory store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// An observability hook requested termination.
    #[error("terminated by hook: {0}")]
    HookTerminated(String),
    /// The signal channel closed while a run was waiting on it.
    #[error("signal channel closed while awaiting {0:?}")]
    SignalChannelClosed(agent_core::AwaitKind),
    /// The signal channel closed while a run was paused via [`crate::Signal::Pause`].
    #[error("signal channel closed while paused")]
    SignalChannelClosedWhilePaused,
}
