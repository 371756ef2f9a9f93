//! Executes `is_agent_tool` requests by running another agent's workflow
//! inline, sharing the caller's cancellation and producing a nested
//! `RunID` derived per spec.md §4.10: `RunID = nest(parentRunID, toolName)`.

use crate::signal::Signal;
use crate::workflow::WorkflowLoop;
use agent_core::identifier::Identifier;
use agent_core::plan::Message;
use agent_core::run::RunOutcome;
use agent_core::ToolErrorInfo;
use agent_core::ToolRequest;
use agent_tool::InlineAgentInvoker;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Resolves an `is_agent_tool` identifier to the [`WorkflowLoop`] that
/// should run it. Implemented by the integrator that owns an agent's
/// route table; `agent-loop` only knows how to run one, not how to find it.
pub trait NestedAgentFactory: Send + Sync {
    /// Build a fresh loop for `tool_name`, or `None` if it does not name
    /// a known nested agent.
    fn build(&self, tool_name: &Identifier) -> Option<WorkflowLoop>;
}

/// Adapts a [`NestedAgentFactory`] into the `InlineAgentInvoker` capability
/// the tool dispatcher consumes.
pub struct NestedAgentRunner {
    factory: Arc<dyn NestedAgentFactory>,
}

impl NestedAgentRunner {
    /// Wrap a factory for use as an `InlineAgentInvoker`.
    #[must_use]
    pub fn new(factory: Arc<dyn NestedAgentFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl InlineAgentInvoker for NestedAgentRunner {
    async fn invoke(&self, request: &ToolRequest, cancellation: &CancellationToken) -> Result<Value, ToolErrorInfo> {
        let mut nested = self.factory.build(&request.name).ok_or_else(|| ToolErrorInfo {
            code: "unknown_nested_agent".to_string(),
            message: format!("no nested agent is routed for {}", request.name),
        })?;

        let nested_run_id = request.run_id.nest(request.name.tool());
        let payload: Value = serde_json::from_slice(&request.payload).unwrap_or(Value::Null);
        let user_message = Message { role: "user".to_string(), content: payload };
        let (_tx, mut rx) = tokio::sync::mpsc::channel::<Signal>(1);

        let output = nested
            .run(nested_run_id, request.session_id.clone(), request.agent_id.clone(), user_message, &mut rx, cancellation.clone())
            .await
            .map_err(|e| ToolErrorInfo { code: "nested_agent_error".to_string(), message: e.to_string() })?;

        match output.outcome {
            RunOutcome::Completed => Ok(output.r#final.map(|m| m.content).unwrap_or(Value::Null)),
            other => Err(ToolErrorInfo {
                code: "nested_agent_failed".to_string(),
                message: output.reason.unwrap_or_else(|| format!("nested run ended with {other:?}")),
            }),
        }
    }
}
