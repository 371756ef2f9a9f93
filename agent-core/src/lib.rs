//! Data model and protocol traits shared across the agent runtime.
//!
//! This crate has no async runtime dependency and no I/O: it defines the
//! vocabulary (`Identifier`, `ToolSpec`, `ToolRequest`/`ToolResult`,
//! `PlanInput`/`PlanResult`, `RunState`) that every other crate in the
//! workspace builds on.

#![deny(missing_docs)]

pub mod budget;
pub mod id;
pub mod identifier;
pub mod plan;
pub mod request;
pub mod result;
pub mod route;
pub mod run;
pub mod spec;

pub use budget::{BudgetCounters, Budgets};
pub use id::{AgentId, RunId, SessionId, TaskQueue, ToolCallId, TurnId, WorkflowName};
pub use identifier::{Identifier, IdentifierParseError};
pub use plan::{AwaitKind, Message, PlanDecision, PlanInput, PlanResult, RenderedReminder, ToolChoice, Usage};
pub use request::ToolRequest;
pub use result::{Bounds, RetryHint, RetryReason, Telemetry, ToolErrorInfo, ToolEvent, ToolResult};
pub use route::AgentRoute;
pub use run::{RunOutcome, RunOutput, RunState, RunStatus};
pub use spec::{Codec, CodecError, JsonCodec, ToolSpec, TypeSpec};
