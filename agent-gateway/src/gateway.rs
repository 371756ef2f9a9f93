//! Brokers tool calls between agents and out-of-process providers over a
//! publish/subscribe bus (spec.md §4.7).

use crate::health::{HealthTracker, ToolsetHealth};
use crate::wire::{CallMeta, ToolResultMessage, ToolsetMessage};
use agent_core::{ToolErrorInfo, ToolRequest};
use agent_runtime::{SinkOptions, Stream};
use agent_tool::RemoteCaller;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors raised while brokering a call through the gateway. These are
/// folded into a [`agent_core::ToolErrorInfo`] at the `RemoteCaller`
/// boundary rather than surfaced directly.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The stream transport rejected a publish or sink operation.
    #[error("stream transport error: {0}")]
    Transport(String),
    /// The result stream closed before a result event arrived.
    #[error("result stream closed before a result arrived for {0}")]
    StreamClosed(String),
    /// A result event did not decode as a [`ToolResultMessage`].
    #[error("malformed result event: {0}")]
    MalformedResult(String),
}

fn request_stream(toolset: &str) -> String {
    format!("toolset:{toolset}:requests")
}

fn result_stream(tool_use_id: &str) -> String {
    format!("result:{tool_use_id}")
}

/// Brokers tool calls to out-of-process providers: publishes each call to
/// its toolset's request stream, opens a lazily-created sink on the
/// matching result stream, and completes on the first result event
/// (spec.md §4.7 "CallTool").
pub struct ToolRegistryGateway {
    stream: Arc<dyn Stream>,
    health: Arc<HealthTracker>,
    registered: Mutex<HashSet<String>>,
}

impl ToolRegistryGateway {
    /// Build a gateway over a pub/sub transport and a shared health tracker.
    #[must_use]
    pub fn new(stream: Arc<dyn Stream>, health: Arc<HealthTracker>) -> Self {
        Self { stream, health, registered: Mutex::new(HashSet::new()) }
    }

    /// Register a toolset as having a reachable remote provider.
    /// Idempotent: re-registration refreshes tracking without duplicating
    /// streams (spec.md §4.7 "Registration idempotence").
    pub fn register_toolset(&self, toolset: &str) {
        self.registered.lock().expect("lock poisoned").insert(toolset.to_string());
        self.health.register(toolset);
    }

    /// Unregister a toolset. Observed by other gateway nodes through the
    /// shared health map, not through this call directly.
    pub fn unregister_toolset(&self, toolset: &str) {
        self.registered.lock().expect("lock poisoned").remove(toolset);
        self.health.unregister(toolset);
    }

    /// Current health of a toolset as tracked by the distributed ticker.
    #[must_use]
    pub fn toolset_health(&self, toolset: &str) -> ToolsetHealth {
        self.health.health(toolset)
    }
}

#[async_trait]
impl RemoteCaller for ToolRegistryGateway {
    fn has_caller(&self, toolset: &str) -> bool {
        self.registered.lock().expect("lock poisoned").contains(toolset)
    }

    async fn call(&self, request: &ToolRequest, cancellation: &CancellationToken) -> Result<Value, ToolErrorInfo> {
        let tool_use_id = request.tool_call_id.to_string();
        let toolset = request.name.toolset().to_string();
        let payload: Value = serde_json::from_slice(&request.payload).unwrap_or(Value::Null);

        let message = ToolsetMessage::Call {
            tool_use_id: tool_use_id.clone(),
            tool: request.name.to_string(),
            payload,
            meta: CallMeta {
                run_id: request.run_id.to_string(),
                session_id: request.session_id.to_string(),
                turn_id: request.turn_id.to_string(),
                tool_call_id: request.tool_call_id.to_string(),
                parent_tool_call_id: request.parent_tool_call_id.as_ref().map(ToString::to_string),
            },
            traceparent: None,
            tracestate: None,
            baggage: None,
        };
        let envelope = serde_json::to_value(&message).map_err(|e| transport_error(e.to_string()))?;

        self.stream.add(&request_stream(&toolset), envelope).await.map_err(|e| transport_error(e.to_string()))?;

        let mut sink = self
            .stream
            .new_sink(&result_stream(&tool_use_id), SinkOptions::default())
            .await
            .map_err(|e| transport_error(e.to_string()))?;

        let outcome = tokio::select! {
            biased;
            () = cancellation.cancelled() => {
                let _ = self.stream.destroy(&result_stream(&tool_use_id)).await;
                return Err(ToolErrorInfo {
                    code: "cancelled".into(),
                    message: "call cancelled before a result arrived".into(),
                });
            }
            next = sink.next() => next,
        };

        let _ = self.stream.destroy(&result_stream(&tool_use_id)).await;

        let Some((_event_id, event)) = outcome else {
            return Err(ToolErrorInfo {
                code: "stream_closed".into(),
                message: format!("result stream closed before a result arrived for {tool_use_id}"),
            });
        };

        let result: ToolResultMessage =
            serde_json::from_value(event).map_err(|e| ToolErrorInfo { code: "malformed_result".into(), message: e.to_string() })?;

        if let Some(error) = result.error {
            warn!(tool_use_id, code = %error.code, "remote provider returned an error result");
            return Err(ToolErrorInfo { code: error.code, message: error.message });
        }

        debug!(tool_use_id, "remote provider returned a result");
        Ok(result.result_json.unwrap_or(Value::Null))
    }
}

fn transport_error(message: String) -> ToolErrorInfo {
    ToolErrorInfo { code: "transport_error".into(), message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::id::{AgentId, RunId, SessionId, ToolCallId, TurnId};
    use agent_core::Identifier;
    use agent_runtime::{EventId, Sink, StoreError};
    use std::collections::VecDeque;
    use tokio::sync::Mutex as AsyncMutex;

    struct FakeSink {
        events: AsyncMutex<VecDeque<(EventId, Value)>>,
    }

    #[async_trait]
    impl Sink for FakeSink {
        async fn next(&mut self) -> Option<(EventId, Value)> {
            self.events.lock().await.pop_front()
        }
    }

    struct FakeStream {
        reply: Value,
    }

    #[async_trait]
    impl Stream for FakeStream {
        async fn add(&self, _event: &str, _payload: Value) -> Result<EventId, StoreError> {
            Ok("1".into())
        }

        async fn new_sink(&self, _name: &str, _opts: SinkOptions) -> Result<Box<dyn Sink>, StoreError> {
            let mut events = VecDeque::new();
            events.push_back(("1".to_string(), self.reply.clone()));
            Ok(Box::new(FakeSink { events: AsyncMutex::new(events) }))
        }

        async fn destroy(&self, _name: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn request() -> ToolRequest {
        let run = RunId::new("r1");
        let turn = TurnId::new("t1");
        ToolRequest {
            name: Identifier::parse("svc.ts.tool").unwrap(),
            payload: b"{}".to_vec(),
            tool_call_id: ToolCallId::derive(&run, &turn, "svc.ts.tool", 0),
            run_id: run,
            session_id: SessionId::new("s1"),
            turn_id: turn,
            parent_tool_call_id: None,
            agent_id: AgentId::new("a1"),
        }
    }

    #[tokio::test]
    async fn successful_result_round_trips() {
        let reply = serde_json::json!({"tool_use_id": "x", "result_json": {"ok": true}, "artifacts": [], "error": null});
        let stream = Arc::new(FakeStream { reply });
        let gateway = ToolRegistryGateway::new(stream, Arc::new(HealthTracker::new(2)));
        gateway.register_toolset("svc.ts");
        assert!(gateway.has_caller("svc.ts"));
        let value = gateway.call(&request(), &CancellationToken::new()).await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn error_result_is_surfaced() {
        let reply = serde_json::json!({
            "tool_use_id": "x",
            "result_json": null,
            "artifacts": [],
            "error": {"code": "boom", "message": "failed"},
        });
        let stream = Arc::new(FakeStream { reply });
        let gateway = ToolRegistryGateway::new(stream, Arc::new(HealthTracker::new(2)));
        let err = gateway.call(&request(), &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.code, "boom");
    }

    #[test]
    fn unregistering_clears_caller_status() {
        let stream = Arc::new(FakeStream { reply: Value::Null });
        let gateway = ToolRegistryGateway::new(stream, Arc::new(HealthTracker::new(2)));
        gateway.register_toolset("svc.ts");
        gateway.unregister_toolset("svc.ts");
        assert!(!gateway.has_caller("svc.ts"));
        assert_eq!(gateway.toolset_health("svc.ts"), ToolsetHealth::Unregistered);
    }
}
