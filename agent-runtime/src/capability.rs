//! Narrow capability interfaces the workflow loop depends on, never on a
//! concrete backend (spec.md §6, §9 "Interface-over-inheritance").

use agent_core::id::RunId;
use agent_core::plan::{PlanInput, PlanResult};
use agent_core::run::RunState;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by a [`ModelClient`] call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelClientError {
    /// The provider rejected the request outright.
    #[error("provider rejected request: {0}")]
    Rejected(String),
    /// Any other provider-side failure.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A provider-agnostic planner call: the core consumes this, never a
/// concrete model-provider wire format (spec.md §1 Non-goals).
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// One non-streaming planner call.
    async fn complete(&self, input: &PlanInput) -> Result<PlanResult, ModelClientError>;

    /// A streaming planner call; implementations may fall back to
    /// buffering `complete` and yielding once.
    async fn stream(&self, input: &PlanInput) -> Result<Box<dyn ModelStreamer>, ModelClientError>;
}

/// An in-flight streaming planner call.
#[async_trait]
pub trait ModelStreamer: Send + Sync {
    /// Poll the next incremental chunk, or `None` once the stream ends.
    async fn next_chunk(&mut self) -> Option<Value>;

    /// Consume the remaining stream and return the final assembled result.
    async fn finish(self: Box<Self>) -> Result<PlanResult, ModelClientError>;
}

/// Errors from a [`MemoryStore`] or [`RunStore`] backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No record exists for the given key.
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other backend failure.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Persistence for a run's conversation events, consumed but never
/// implemented by the core (spec.md §1 Non-goals).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Load all events recorded for a run.
    async fn load_run(&self, run_id: &RunId) -> Result<Vec<Value>, StoreError>;

    /// Append new events to a run's history.
    async fn append_events(&self, run_id: &RunId, events: Vec<Value>) -> Result<(), StoreError>;
}

/// Persistence for run metadata, consumed but never implemented by the
/// core.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Insert or update a run's state.
    async fn upsert(&self, state: &RunState) -> Result<(), StoreError>;

    /// Load a run's current state.
    async fn load(&self, run_id: &RunId) -> Result<Option<RunState>, StoreError>;
}

/// A handle to a single event position in a [`Stream`].
pub type EventId = String;

/// Options controlling where a [`Sink`] begins reading.
#[derive(Debug, Clone)]
pub struct SinkOptions {
    /// The event id to resume from; `"0"` means "from the oldest event"
    /// so that events published before the sink attaches are not lost
    /// (spec.md §4.10 "Result-stream semantics").
    pub last_event_id: EventId,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self { last_event_id: "0".to_string() }
    }
}

/// A subscription positioned within a named stream.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Await the next event at or after this sink's cursor.
    async fn next(&mut self) -> Option<(EventId, Value)>;
}

/// The publish/subscribe transport capability the core consumes but
/// never implements (spec.md §1 Non-goals).
#[async_trait]
pub trait Stream: Send + Sync {
    /// Publish `payload` under `event` on this stream, returning the
    /// assigned event id.
    async fn add(&self, event: &str, payload: Value) -> Result<EventId, StoreError>;

    /// Open a sink on a named stream starting at `opts.last_event_id`.
    async fn new_sink(&self, name: &str, opts: SinkOptions) -> Result<Box<dyn Sink>, StoreError>;

    /// Tear down a named stream and any resources it holds.
    async fn destroy(&self, name: &str) -> Result<(), StoreError>;
}

/// Errors raised by the [`Engine`] capability.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The named workflow, activity, or run does not exist.
    #[error("unknown: {0}")]
    Unknown(String),
    /// Any other engine-side failure.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The scheduling substrate the workflow loop runs atop. `InMemory` and
/// `Durable` variants share this one contract (spec.md §9).
#[async_trait]
pub trait Engine: Send + Sync {
    /// Start a new workflow run.
    async fn start_workflow(&self, run_id: &RunId, workflow_name: &str, input: Value) -> Result<(), EngineError>;

    /// Execute a named activity as a durable, retryable unit of work.
    async fn execute_activity(&self, activity_name: &str, input: Value) -> Result<Value, EngineError>;

    /// Execute a nested workflow inline within the parent's history.
    async fn execute_child_workflow(&self, run_id: &RunId, workflow_name: &str, input: Value) -> Result<Value, EngineError>;

    /// Deliver a signal to a running workflow.
    async fn signal_workflow(&self, run_id: &RunId, signal_name: &str, payload: Value) -> Result<(), EngineError>;

    /// Request cancellation of a running workflow.
    async fn cancel_workflow(&self, run_id: &RunId) -> Result<(), EngineError>;
}
