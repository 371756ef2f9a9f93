//! Serves a toolset's request stream on the provider side (spec.md §4.8).

use crate::health::SharedHealthMap;
use crate::wire::{ResultArtifact, ResultError, ToolResultMessage, ToolsetMessage};
use agent_core::ToolErrorInfo;
use agent_runtime::{SinkOptions, Stream};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument};

/// Errors raised by a [`ProviderLoop`] itself, as opposed to errors a
/// handler returns for an individual call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderLoopError {
    /// The stream transport rejected opening the request sink.
    #[error("stream transport error: {0}")]
    Transport(String),
}

/// Publishes intermediate output before a handler's final result, per
/// spec.md §4.8 "Output-delta publishing".
#[async_trait]
pub trait DeltaSink: Send + Sync {
    /// Publish one partial output delta to the call's result stream.
    async fn publish(&self, delta: Value);
}

struct StreamDeltaSink {
    stream: Arc<dyn Stream>,
    tool_use_id: String,
}

#[async_trait]
impl DeltaSink for StreamDeltaSink {
    async fn publish(&self, delta: Value) {
        let message = ToolResultMessage {
            tool_use_id: self.tool_use_id.clone(),
            result_json: Some(delta),
            artifacts: Vec::<ResultArtifact>::new(),
            error: None,
        };
        let envelope = serde_json::to_value(&message).unwrap_or(Value::Null);
        if let Err(e) = self.stream.add(&format!("result:{}", self.tool_use_id), envelope).await {
            warn!(tool_use_id = %self.tool_use_id, error = %e, "failed to publish output delta");
        }
    }
}

/// Executes one tool call on the provider side. Implementations should
/// use `deltas` to stream partial output when the call is long-running.
#[async_trait]
pub trait ProviderHandler: Send + Sync {
    /// Run `tool` against `payload`, optionally emitting deltas before
    /// returning the final decoded result.
    async fn handle(&self, tool: &str, payload: Value, deltas: &dyn DeltaSink) -> Result<Value, ToolErrorInfo>;
}

/// Bounds on a [`ProviderLoop`]'s worker pool and overflow queue.
#[derive(Debug, Clone)]
pub struct ProviderLoopConfig {
    /// Maximum tool calls executing concurrently.
    pub max_concurrent_tool_calls: usize,
    /// Maximum calls queued waiting for a free worker before new calls are
    /// rejected with a structured error.
    pub max_queued_tool_calls: usize,
}

impl Default for ProviderLoopConfig {
    fn default() -> Self {
        Self { max_concurrent_tool_calls: 8, max_queued_tool_calls: 32 }
    }
}

/// Subscribes to `toolset:<name>:requests`, dispatching calls onto a
/// bounded worker pool while answering pings on a dedicated lane that
/// never blocks on worker capacity (spec.md §4.8 "Critical invariant").
pub struct ProviderLoop {
    toolset: String,
    stream: Arc<dyn Stream>,
    handler: Arc<dyn ProviderHandler>,
    health: Arc<dyn SharedHealthMap>,
    permits: Arc<Semaphore>,
    queued: Arc<AtomicUsize>,
    config: ProviderLoopConfig,
}

impl ProviderLoop {
    /// Build a provider loop serving `toolset` with `handler`, reporting
    /// liveness through `health`.
    #[must_use]
    pub fn new(
        toolset: impl Into<String>,
        stream: Arc<dyn Stream>,
        handler: Arc<dyn ProviderHandler>,
        health: Arc<dyn SharedHealthMap>,
        config: ProviderLoopConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_tool_calls.max(1)));
        Self { toolset: toolset.into(), stream, handler, health, permits, queued: Arc::new(AtomicUsize::new(0)), config }
    }

    /// Serve the toolset's request stream until `cancellation` fires or
    /// the stream is torn down. A failed pong does not stop the loop
    /// (spec.md §4.8 "A failed `Pong` does not terminate the loop").
    pub async fn run(&self, cancellation: CancellationToken) -> Result<(), ProviderLoopError> {
        let request_stream = format!("toolset:{}:requests", self.toolset);
        let mut sink = self
            .stream
            .new_sink(&request_stream, SinkOptions::default())
            .await
            .map_err(|e| ProviderLoopError::Transport(e.to_string()))?;

        loop {
            let event = tokio::select! {
                biased;
                () = cancellation.cancelled() => break,
                next = sink.next() => next,
            };
            let Some((_event_id, payload)) = event else {
                debug!(toolset = %self.toolset, "request stream closed");
                break;
            };

            let message: ToolsetMessage = match serde_json::from_value(payload) {
                Ok(message) => message,
                Err(e) => {
                    warn!(toolset = %self.toolset, error = %e, "dropping malformed toolset message");
                    continue;
                }
            };

            match message {
                ToolsetMessage::Ping { ping_id } => self.answer_ping(&ping_id).await,
                ToolsetMessage::Call { tool_use_id, tool, payload, traceparent, .. } => {
                    self.accept_call(tool_use_id, tool, payload, traceparent).await;
                }
            }
        }
        Ok(())
    }

    async fn answer_ping(&self, ping_id: &str) {
        self.health.record_pong(&self.toolset, ping_id).await;
        debug!(toolset = %self.toolset, ping_id, "answered ping");
    }

    async fn accept_call(&self, tool_use_id: String, tool: String, payload: Value, traceparent: Option<String>) {
        if self.queued.load(Ordering::Acquire) >= self.config.max_queued_tool_calls {
            warn!(toolset = %self.toolset, tool_use_id, "overflow queue full, rejecting call");
            self.publish_error(&tool_use_id, "queue_full", "provider overflow queue is full").await;
            return;
        }
        self.queued.fetch_add(1, Ordering::AcqRel);
        self.spawn_call(tool_use_id, tool, payload, traceparent);
    }

    fn spawn_call(&self, tool_use_id: String, tool: String, payload: Value, traceparent: Option<String>) {
        let permits = self.permits.clone();
        let handler = self.handler.clone();
        let stream = self.stream.clone();
        let queued = self.queued.clone();
        let span = info_span!("tool_call", tool_use_id = %tool_use_id, tool = %tool, traceparent = traceparent.as_deref().unwrap_or(""));

        tokio::spawn(
            async move {
                let permit = permits.acquire_owned().await.expect("semaphore not closed");
                queued.fetch_sub(1, Ordering::AcqRel);
                let deltas = StreamDeltaSink { stream: stream.clone(), tool_use_id: tool_use_id.clone() };
                let outcome = handler.handle(&tool, payload, &deltas).await;
                drop(permit);

                let message = match outcome {
                    Ok(value) => {
                        ToolResultMessage { tool_use_id: tool_use_id.clone(), result_json: Some(value), artifacts: vec![], error: None }
                    }
                    Err(err) => {
                        warn!(code = %err.code, "tool handler returned an error");
                        ToolResultMessage {
                            tool_use_id: tool_use_id.clone(),
                            result_json: None,
                            artifacts: vec![],
                            error: Some(ResultError { code: err.code, message: err.message }),
                        }
                    }
                };
                let envelope = serde_json::to_value(&message).unwrap_or(Value::Null);
                if let Err(e) = stream.add(&format!("result:{tool_use_id}"), envelope).await {
                    error!(error = %e, "failed to publish tool result");
                }
            }
            .instrument(span),
        );
    }

    async fn publish_error(&self, tool_use_id: &str, code: &str, message: &str) {
        let payload = ToolResultMessage {
            tool_use_id: tool_use_id.to_string(),
            result_json: None,
            artifacts: vec![],
            error: Some(ResultError { code: code.into(), message: message.into() }),
        };
        let envelope = serde_json::to_value(&payload).unwrap_or(Value::Null);
        if let Err(e) = self.stream.add(&format!("result:{tool_use_id}"), envelope).await {
            error!(tool_use_id, error = %e, "failed to publish overflow error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_runtime::{EventId, Sink, StoreError};
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Mutex as AsyncMutex;
    use tokio::time::{sleep, Duration};

    struct RecordingStream {
        results: AsyncMutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl Stream for RecordingStream {
        async fn add(&self, event: &str, payload: Value) -> Result<EventId, StoreError> {
            self.results.lock().await.push((event.to_string(), payload));
            Ok("1".into())
        }

        async fn new_sink(&self, _name: &str, _opts: SinkOptions) -> Result<Box<dyn Sink>, StoreError> {
            unreachable!("test drives the single shared request sink directly")
        }

        async fn destroy(&self, _name: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct EchoHandler {
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ProviderHandler for EchoHandler {
        async fn handle(&self, tool: &str, payload: Value, _deltas: &dyn DeltaSink) -> Result<Value, ToolErrorInfo> {
            self.called.store(true, Ordering::SeqCst);
            Ok(serde_json::json!({"tool": tool, "echoed": payload}))
        }
    }

    struct NullHealth;
    #[async_trait]
    impl SharedHealthMap for NullHealth {
        async fn record_pong(&self, _toolset: &str, _ping_id: &str) {}
        async fn last_pong(&self, _toolset: &str) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn ping_is_answered_independently_of_worker_saturation() {
        // A handler that never returns ties up the single worker permit
        // for the duration of the test; the ping path must not route
        // through it at all.
        struct StuckHandler;
        #[async_trait]
        impl ProviderHandler for StuckHandler {
            async fn handle(&self, _tool: &str, _payload: Value, _deltas: &dyn DeltaSink) -> Result<Value, ToolErrorInfo> {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }

        let stream = Arc::new(RecordingStream { results: AsyncMutex::new(vec![]) });
        let loop_stream: Arc<dyn Stream> = stream.clone();
        let provider = ProviderLoop::new(
            "svc.ts",
            loop_stream,
            Arc::new(StuckHandler),
            Arc::new(NullHealth),
            ProviderLoopConfig { max_concurrent_tool_calls: 1, max_queued_tool_calls: 1 },
        );

        provider.accept_call("tu1".into(), "svc.ts.slow".into(), serde_json::json!({}), None).await;
        sleep(Duration::from_millis(20)).await;

        let before = tokio::time::Instant::now();
        provider.answer_ping("p1").await;
        assert!(before.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn successful_call_publishes_a_result() {
        let stream = Arc::new(RecordingStream { results: AsyncMutex::new(vec![]) });
        let loop_stream: Arc<dyn Stream> = stream.clone();
        let called = Arc::new(AtomicBool::new(false));
        let provider = ProviderLoop::new(
            "svc.ts",
            loop_stream,
            Arc::new(EchoHandler { called: called.clone() }),
            Arc::new(NullHealth),
            ProviderLoopConfig::default(),
        );
        provider.accept_call("tu1".into(), "svc.ts.echo".into(), serde_json::json!({"x": 1}), None).await;
        sleep(Duration::from_millis(20)).await;
        assert!(called.load(Ordering::SeqCst));
        let results = stream.results.lock().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "result:tu1");
    }

    #[tokio::test]
    async fn overflow_queue_rejects_with_structured_error() {
        let stream = Arc::new(RecordingStream { results: AsyncMutex::new(vec![]) });
        let loop_stream: Arc<dyn Stream> = stream.clone();
        let called = Arc::new(AtomicBool::new(false));
        let provider = ProviderLoop::new(
            "svc.ts",
            loop_stream,
            Arc::new(EchoHandler { called }),
            Arc::new(NullHealth),
            ProviderLoopConfig { max_concurrent_tool_calls: 1, max_queued_tool_calls: 0 },
        );
        provider.queued.fetch_add(1, Ordering::AcqRel);
        provider.accept_call("tu1".into(), "svc.ts.echo".into(), serde_json::json!({}), None).await;
        let results = stream.results.lock().await;
        assert_eq!(results.len(), 1);
        let message: ToolResultMessage = serde_json::from_value(results[0].1.clone()).unwrap();
        assert_eq!(message.error.unwrap().code, "queue_full");
    }
}
