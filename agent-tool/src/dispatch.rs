//! Concurrent tool dispatch across the three wire modes: in-process
//! activity, inline nested agent, and stream-routed remote provider
//! (spec.md §4.6).

use crate::registry::ToolRegistry;
use agent_core::{RetryHint, RetryReason, ToolErrorInfo, ToolRequest, ToolResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Executes a tool request whose toolset is bound to in-process code,
/// running on the engine's activity task queue.
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    /// Run one call. Implementations should respect `cancellation` and
    /// return promptly once it fires.
    async fn invoke(&self, request: &ToolRequest, cancellation: &CancellationToken) -> Result<Value, ToolErrorInfo>;
}

/// Executes a tool request whose toolset has a live stream-gateway
/// caller, implemented by `agent-gateway`.
#[async_trait]
pub trait RemoteCaller: Send + Sync {
    /// True if this toolset currently has a reachable remote provider.
    fn has_caller(&self, toolset: &str) -> bool;

    /// Publish the call and await its result over the gateway.
    async fn call(&self, request: &ToolRequest, cancellation: &CancellationToken) -> Result<Value, ToolErrorInfo>;
}

/// Executes an `is_agent_tool` request by running a nested agent inline
/// within the same workflow history, implemented by `agent-loop`.
#[async_trait]
pub trait InlineAgentInvoker: Send + Sync {
    /// Run the nested agent to completion and adapt its final output to
    /// a decoded tool result value.
    async fn invoke(&self, request: &ToolRequest, cancellation: &CancellationToken) -> Result<Value, ToolErrorInfo>;
}

/// Which of the three wire modes a request routes through.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Route {
    /// In-process activity execution.
    Activity,
    /// Inline nested-agent execution.
    InlineAgent,
    /// Stream-routed remote provider via the gateway.
    Remote,
}

/// Decide which wire mode a request should take, per spec.md §4.6:
/// agent tools go inline; tools whose toolset has a live gateway caller
/// go remote; everything else is a local activity.
#[must_use]
pub fn classify(registry: &ToolRegistry, request: &ToolRequest, remote: &dyn RemoteCaller) -> Option<Route> {
    let spec = registry.get(&request.name)?;
    if spec.is_agent_tool {
        return Some(Route::InlineAgent);
    }
    if remote.has_caller(&spec.toolset) {
        return Some(Route::Remote);
    }
    Some(Route::Activity)
}

/// The set of capabilities the dispatcher needs to execute one turn's
/// worth of tool calls.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    activity: Arc<dyn ActivityHandler>,
    remote: Arc<dyn RemoteCaller>,
    inline_agent: Arc<dyn InlineAgentInvoker>,
}

impl Dispatcher {
    /// Build a dispatcher over a frozen registry and the three executors.
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        activity: Arc<dyn ActivityHandler>,
        remote: Arc<dyn RemoteCaller>,
        inline_agent: Arc<dyn InlineAgentInvoker>,
    ) -> Self {
        Self { registry, activity, remote, inline_agent }
    }

    /// Execute `requests` concurrently, preserving input order in the
    /// returned results regardless of completion order (spec.md §8
    /// invariant 3). Cancelling `cancellation` stops in-flight futures;
    /// results arriving after cancellation are discarded by the caller.
    pub async fn dispatch_turn(&self, requests: &[ToolRequest], cancellation: &CancellationToken) -> Vec<ToolResult> {
        let futs = requests.iter().map(|request| self.dispatch_one(request, cancellation));
        futures::future::join_all(futs).await
    }

    async fn dispatch_one(&self, request: &ToolRequest, cancellation: &CancellationToken) -> ToolResult {
        let Some(spec) = self.registry.get(&request.name) else {
            return error_result(
                request,
                ToolErrorInfo { code: "unknown_tool".into(), message: format!("no such tool: {}", request.name) },
                None,
            );
        };

        let route = if spec.is_agent_tool {
            Route::InlineAgent
        } else if self.remote.has_caller(&spec.toolset) {
            Route::Remote
        } else {
            Route::Activity
        };
        debug!(tool = %request.name, ?route, "dispatching tool call");

        let outcome = match route {
            Route::Activity => self.activity.invoke(request, cancellation).await,
            Route::Remote => self.remote.call(request, cancellation).await,
            Route::InlineAgent => self.inline_agent.invoke(request, cancellation).await,
        };

        match outcome {
            Ok(value) => {
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
            Err(error) => {
                warn!(tool = %request.name, error = %error, "tool call failed");
                let hint = retry_hint_for(&error);
                error_result(request, error, hint)
            }
        }
    }
}

fn retry_hint_for(error: &ToolErrorInfo) -> Option<RetryHint> {
    if error.code == "invalid_arguments" {
        return Some(RetryHint {
            reason: RetryReason::InvalidArguments,
            restrict_to_tool: None,
            message: error.message.clone(),
        });
    }
    None
}

fn error_result(request: &ToolRequest, error: ToolErrorInfo, retry_hint: Option<RetryHint>) -> ToolResult {
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
        error: Some(error),
        retry_hint,
        telemetry: None,
        children_count: 0,
        run_link: None,
    }
}

/// Synthesize a tool-error result for a call the policy layer truncated
/// from a planner's turn for exceeding `PerTurnMaxToolCalls` (spec.md
/// §4.5): this forces re-planning rather than silently dropping the call.
#[must_use]
pub fn synthesize_surplus_error(request: &ToolRequest) -> ToolResult {
    error_result(
        request,
        ToolErrorInfo {
            code: "per_turn_budget_exceeded".into(),
            message: "tool call exceeded the per-turn call budget".into(),
        },
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistryBuilder;
    use agent_core::id::{AgentId, RunId, SessionId, ToolCallId, TurnId};
    use agent_core::spec::TypeSpec;
    use agent_core::ToolSpec;

    fn request(name: &str) -> ToolRequest {
        let run = RunId::new("r1");
        let turn = TurnId::new("t1");
        ToolRequest {
            name: agent_core::Identifier::parse(name).unwrap(),
            payload: b"{}".to_vec(),
            tool_call_id: ToolCallId::derive(&run, &turn, name, 0),
            run_id: run,
            session_id: SessionId::new("s1"),
            turn_id: turn,
            parent_tool_call_id: None,
            agent_id: AgentId::new("a1"),
        }
    }

    fn spec(name: &str, is_agent_tool: bool) -> ToolSpec {
        ToolSpec {
            name: agent_core::Identifier::parse(name).unwrap(),
            toolset: "svc.ts".into(),
            payload: TypeSpec { name: "P".into(), schema: b"{}".to_vec(), codec_name: "json".into() },
            result: TypeSpec { name: "R".into(), schema: b"{}".to_vec(), codec_name: "json".into() },
            sidecar: None,
            description: "t".into(),
            tags: vec![],
            bounded_result: false,
            is_agent_tool,
            agent_route: None,
        }
    }

    struct NoCaller;
    #[async_trait]
    impl RemoteCaller for NoCaller {
        fn has_caller(&self, _toolset: &str) -> bool {
            false
        }
        async fn call(&self, request: &ToolRequest, _c: &CancellationToken) -> Result<Value, ToolErrorInfo> {
            Err(ToolErrorInfo { code: "unreachable".into(), message: request.name.to_string() })
        }
    }

    struct EchoActivity;
    #[async_trait]
    impl ActivityHandler for EchoActivity {
        async fn invoke(&self, request: &ToolRequest, _c: &CancellationToken) -> Result<Value, ToolErrorInfo> {
            Ok(serde_json::json!({"echoed": request.name.to_string()}))
        }
    }

    struct UnusedInline;
    #[async_trait]
    impl InlineAgentInvoker for UnusedInline {
        async fn invoke(&self, _request: &ToolRequest, _c: &CancellationToken) -> Result<Value, ToolErrorInfo> {
            unreachable!("not exercised by this test")
        }
    }

    #[test]
    fn agent_tool_always_routes_inline() {
        let mut builder = ToolRegistryBuilder::new();
        builder.register(spec("svc.ts.sub_agent", true)).unwrap();
        let registry = builder.build();
        let route = classify(&registry, &request("svc.ts.sub_agent"), &NoCaller).unwrap();
        assert_eq!(route, Route::InlineAgent);
    }

    #[test]
    fn non_agent_tool_without_caller_routes_activity() {
        let mut builder = ToolRegistryBuilder::new();
        builder.register(spec("svc.ts.echo", false)).unwrap();
        let registry = builder.build();
        let route = classify(&registry, &request("svc.ts.echo"), &NoCaller).unwrap();
        assert_eq!(route, Route::Activity);
    }

    #[tokio::test]
    async fn dispatch_turn_preserves_input_order_regardless_of_completion() {
        let mut builder = ToolRegistryBuilder::new();
        builder.register(spec("svc.ts.a", false)).unwrap();
        builder.register(spec("svc.ts.b", false)).unwrap();
        builder.register(spec("svc.ts.c", false)).unwrap();
        let registry = Arc::new(builder.build());
        let dispatcher = Dispatcher::new(
            registry,
            Arc::new(EchoActivity),
            Arc::new(NoCaller),
            Arc::new(UnusedInline),
        );
        let requests = vec![request("svc.ts.a"), request("svc.ts.b"), request("svc.ts.c")];
        let results = dispatcher.dispatch_turn(&requests, &CancellationToken::new()).await;
        let names: Vec<String> = results.iter().map(|r| r.name.to_string()).collect();
        assert_eq!(names, vec!["svc.ts.a", "svc.ts.b", "svc.ts.c"]);
    }

    #[tokio::test]
    async fn unknown_tool_yields_structured_error() {
        let registry = Arc::new(ToolRegistryBuilder::new().build());
        let dispatcher = Dispatcher::new(registry, Arc::new(EchoActivity), Arc::new(NoCaller), Arc::new(UnusedInline));
        let results = dispatcher.dispatch_turn(&[request("svc.ts.missing")], &CancellationToken::new()).await;
        assert!(results[0].is_error());
    }
}
