//! Registers a remote agent as a local toolset and maps its JSON-RPC
//! responses back to `ToolResult` (spec.md §4.11).

use crate::rpc::{A2ATransport, JsonRpcError, CODE_INVALID_PARAMS, CODE_METHOD_NOT_FOUND};
use crate::types::{AgentCard, ProviderConfig, RegistrationError};
use agent_core::{Identifier, RetryHint, RetryReason, ToolErrorInfo, ToolRequest, ToolResult};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// A provider config validated against the remote's own `AgentCard`,
/// ready to execute task calls.
pub struct ToolsetRegistration {
    config: ProviderConfig,
    transport: Arc<dyn A2ATransport>,
}

/// Validate `config.skills` against `card.skills`: every configured skill
/// must be present on the card with a matching description (spec.md
/// §4.11 "Card-consistency validation").
pub fn validate_card(config: &ProviderConfig, card: &AgentCard) -> Result<(), RegistrationError> {
    if card.suite != config.suite {
        return Err(RegistrationError {
            suite: config.suite.clone(),
            url: config.url.clone(),
            reason: format!("card suite `{}` does not match configured suite `{}`", card.suite, config.suite),
        });
    }
    for skill in &config.skills {
        let Some(card_skill) = card.skills.iter().find(|s| s.name == skill.name) else {
            return Err(RegistrationError {
                suite: config.suite.clone(),
                url: config.url.clone(),
                reason: format!("remote card is missing skill `{}`", skill.name),
            });
        };
        if card_skill.description != skill.description {
            return Err(RegistrationError {
                suite: config.suite.clone(),
                url: config.url.clone(),
                reason: format!(
                    "skill `{}` description mismatch: configured {:?}, remote {:?}",
                    skill.name, skill.description, card_skill.description
                ),
            });
        }
    }
    Ok(())
}

impl ToolsetRegistration {
    /// Register `config` against `transport` after validating the remote
    /// card is a superset of the configured skills.
    ///
    /// # Errors
    /// Returns [`RegistrationError`] if the card is missing a skill or a
    /// description mismatches.
    pub fn register(
        config: ProviderConfig,
        card: &AgentCard,
        transport: Arc<dyn A2ATransport>,
    ) -> Result<Self, RegistrationError> {
        validate_card(&config, card)?;
        Ok(Self { config, transport })
    }

    /// The suite this registration fronts.
    #[must_use]
    pub fn suite(&self) -> &str {
        &self.config.suite
    }

    /// Execute one tool call by sending `tasks/send` to the provider and
    /// mapping its response back to a decoded [`ToolResult`].
    pub async fn execute(&self, request: &ToolRequest) -> ToolResult {
        let skill = request.name.tool();
        let payload: Value = serde_json::from_slice(&request.payload).unwrap_or(Value::Null);
        let params = json!({"suite": self.config.suite, "skill": skill, "payload": payload});

        match self.transport.call(&self.config.url, "tasks/send", params).await {
            Ok(value) => success_result(request, value),
            Err(error) => {
                warn!(suite = %self.config.suite, skill, code = error.code, "A2A task call failed");
                failure_result(request, error)
            }
        }
    }
}

fn success_result(request: &ToolRequest, value: Value) -> ToolResult {
    let encoded = serde_json::to_vec(&value).unwrap_or_default();
    ToolResult {
        name: request.name.clone(),
        tool_call_id: request.tool_call_id.clone(),
        result: Some(value),
        result_bytes: encoded.len(),
        result_omitted: false,
        result_omitted_reason: None,
        server_data: None,
        sidecar: None,
        bounds: None,
        error: None,
        retry_hint: None,
        telemetry: None,
        children_count: 0,
        run_link: None,
    }
}

fn failure_result(request: &ToolRequest, error: JsonRpcError) -> ToolResult {
    let retry_hint = retry_hint_for(&request.name, &error);
    ToolResult {
        name: request.name.clone(),
        tool_call_id: request.tool_call_id.clone(),
        result: None,
        result_bytes: 0,
        result_omitted: false,
        result_omitted_reason: None,
        server_data: None,
        sidecar: None,
        bounds: None,
        error: Some(ToolErrorInfo { code: error.code.to_string(), message: error.message.clone() }),
        retry_hint,
        telemetry: None,
        children_count: 0,
        run_link: None,
    }
}

/// Map a JSON-RPC error code to planner retry guidance (spec.md §4.11).
#[must_use]
pub fn retry_hint_for(tool: &Identifier, error: &JsonRpcError) -> Option<RetryHint> {
    match error.code {
        CODE_INVALID_PARAMS => Some(RetryHint {
            reason: RetryReason::InvalidArguments,
            restrict_to_tool: Some(tool.clone()),
            message: format!("call to `{tool}` rejected with invalid params: {}. Retry with corrected arguments.", error.message),
        }),
        CODE_METHOD_NOT_FOUND => {
            Some(RetryHint { reason: RetryReason::ToolUnavailable, restrict_to_tool: None, message: error.message.clone() })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn config() -> ProviderConfig {
        ProviderConfig {
            suite: "weather".into(),
            url: "bus://weather".into(),
            skills: vec![crate::types::SkillConfig {
                name: "forecast".into(),
                description: "7-day forecast".into(),
                tags: vec![],
            }],
        }
    }

    fn matching_card() -> AgentCard {
        AgentCard {
            suite: "weather".into(),
            skills: vec![crate::types::CardSkill { name: "forecast".into(), description: "7-day forecast".into() }],
        }
    }

    struct EchoTransport;
    #[async_trait]
    impl A2ATransport for EchoTransport {
        async fn call(&self, _url: &str, _method: &str, params: Value) -> Result<Value, JsonRpcError> {
            Ok(params)
        }
    }

    struct FailingTransport(i64);
    #[async_trait]
    impl A2ATransport for FailingTransport {
        async fn call(&self, _url: &str, _method: &str, _params: Value) -> Result<Value, JsonRpcError> {
            Err(JsonRpcError { code: self.0, message: "bad".into(), data: None })
        }
    }

    fn request() -> ToolRequest {
        use agent_core::id::{AgentId, RunId, SessionId, ToolCallId, TurnId};
        let run = RunId::new("r1");
        let turn = TurnId::new("t1");
        ToolRequest {
            name: Identifier::parse("a2a.weather.forecast").unwrap(),
            payload: b"{\"city\":\"nyc\"}".to_vec(),
            tool_call_id: ToolCallId::derive(&run, &turn, "a2a.weather.forecast", 0),
            run_id: run,
            session_id: SessionId::new("s1"),
            turn_id: turn,
            parent_tool_call_id: None,
            agent_id: AgentId::new("a1"),
        }
    }

    #[test]
    fn card_missing_skill_is_rejected() {
        let card = AgentCard { suite: "weather".into(), skills: vec![] };
        assert!(validate_card(&config(), &card).is_err());
    }

    #[test]
    fn mismatched_description_is_rejected() {
        let mut card = matching_card();
        card.skills[0].description = "hourly forecast".into();
        assert!(validate_card(&config(), &card).is_err());
    }

    #[tokio::test]
    async fn successful_call_round_trips_payload() {
        let reg = ToolsetRegistration::register(config(), &matching_card(), Arc::new(EchoTransport)).unwrap();
        let result = reg.execute(&request()).await;
        assert!(!result.is_error());
        assert_eq!(result.result.unwrap()["skill"], "forecast");
    }

    #[tokio::test]
    async fn invalid_params_maps_to_restrict_to_tool_hint() {
        let reg = ToolsetRegistration::register(config(), &matching_card(), Arc::new(FailingTransport(CODE_INVALID_PARAMS))).unwrap();
        let result = reg.execute(&request()).await;
        let hint = result.retry_hint.unwrap();
        assert_eq!(hint.reason, RetryReason::InvalidArguments);
        assert!(hint.restrict_to_tool.is_some());
    }

    #[tokio::test]
    async fn method_not_found_maps_to_unavailable_with_no_restriction() {
        let reg = ToolsetRegistration::register(config(), &matching_card(), Arc::new(FailingTransport(CODE_METHOD_NOT_FOUND))).unwrap();
        let result = reg.execute(&request()).await;
        let hint = result.retry_hint.unwrap();
        assert_eq!(hint.reason, RetryReason::ToolUnavailable);
        assert!(hint.restrict_to_tool.is_none());
    }

    #[tokio::test]
    async fn other_codes_carry_no_hint() {
        let reg = ToolsetRegistration::register(config(), &matching_card(), Arc::new(FailingTransport(-32000))).unwrap();
        let result = reg.execute(&request()).await;
        assert!(result.retry_hint.is_none());
    }
}
