//! A scripted [`ModelClient`] double that replays a fixed sequence of
//! [`PlanResult`]s, one per call, for deterministic workflow tests.

use agent_core::plan::{PlanInput, PlanResult};
use agent_runtime::{ModelClient, ModelClientError, ModelStreamer};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Replays a queue of planner responses in order; errors once exhausted.
pub struct ScriptedModelClient {
    script: Mutex<VecDeque<PlanResult>>,
}

impl ScriptedModelClient {
    /// Build a client that yields `script` in order, one result per call.
    #[must_use]
    pub fn new(script: Vec<PlanResult>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()) }
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn complete(&self, _input: &PlanInput) -> Result<PlanResult, ModelClientError> {
        let mut script = self.script.lock().await;
        script.pop_front().ok_or_else(|| ModelClientError::Rejected("scripted planner exhausted".to_string()))
    }

    async fn stream(&self, input: &PlanInput) -> Result<Box<dyn ModelStreamer>, ModelClientError> {
        let result = self.complete(input).await?;
        Ok(Box::new(BufferedStreamer { result: Some(result) }))
    }
}

struct BufferedStreamer {
    result: Option<PlanResult>,
}

#[async_trait]
impl ModelStreamer for BufferedStreamer {
    async fn next_chunk(&mut self) -> Option<Value> {
        None
    }

    async fn finish(self: Box<Self>) -> Result<PlanResult, ModelClientError> {
        self.result.ok_or_else(|| ModelClientError::Rejected("stream already finished".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::budget::Budgets;
    use agent_core::id::AgentId;
    use agent_core::plan::{PlanDecision, ToolChoice};

    fn input() -> PlanInput {
        PlanInput {
            agent: AgentId::new("a1"),
            messages: vec![],
            available_tools: vec![],
            tool_choice: ToolChoice::Auto,
            restrict_to_tool: None,
            budgets: Budgets::default(),
            reminders: vec![],
        }
    }

    fn final_result(text: &str) -> PlanResult {
        PlanResult {
            decision: PlanDecision::FinalResponse { text: text.to_string() },
            thinking: None,
            assistant_text: None,
            usage: None,
        }
    }

    #[tokio::test]
    async fn replays_results_in_order_then_errors() {
        let client = ScriptedModelClient::new(vec![final_result("one"), final_result("two")]);
        let first = client.complete(&input()).await.unwrap();
        let PlanDecision::FinalResponse { text } = first.decision else { panic!("expected final") };
        assert_eq!(text, "one");
        let second = client.complete(&input()).await.unwrap();
        let PlanDecision::FinalResponse { text } = second.decision else { panic!("expected final") };
        assert_eq!(text, "two");
        assert!(client.complete(&input()).await.is_err());
    }
}
