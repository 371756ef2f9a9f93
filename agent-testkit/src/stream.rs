//! In-memory [`Stream`]/[`Sink`] pair, backed by a `Vec` guarded by a
//! `tokio::sync::RwLock` with a `Notify` waking waiting sinks — the same
//! shape the workspace's capability traits expect a durable pub/sub bus
//! to have, minus persistence.

use agent_runtime::{EventId, Sink, Stream, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

struct Inner {
    events: Vec<(EventId, Value)>,
    notify: Notify,
}

/// A single append-only event log with any number of independently
/// positioned sinks.
pub struct InMemoryStream {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStream {
    /// Start an empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(Inner { events: Vec::new(), notify: Notify::new() })) }
    }
}

impl Default for InMemoryStream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stream for InMemoryStream {
    async fn add(&self, event: &str, payload: Value) -> Result<EventId, StoreError> {
        let mut inner = self.inner.write().await;
        let id = inner.events.len().to_string();
        let envelope = serde_json::json!({"event": event, "payload": payload});
        inner.events.push((id.clone(), envelope));
        inner.notify.notify_waiters();
        Ok(id)
    }

    async fn new_sink(&self, _name: &str, opts: agent_runtime::SinkOptions) -> Result<Box<dyn Sink>, StoreError> {
        let cursor = opts.last_event_id.parse::<usize>().unwrap_or(0);
        Ok(Box::new(InMemorySink { inner: Arc::clone(&self.inner), cursor }))
    }

    async fn destroy(&self, _name: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.events.clear();
        inner.notify.notify_waiters();
        Ok(())
    }
}

struct InMemorySink {
    inner: Arc<RwLock<Inner>>,
    cursor: usize,
}

#[async_trait]
impl Sink for InMemorySink {
    async fn next(&mut self) -> Option<(EventId, Value)> {
        loop {
            {
                let inner = self.inner.read().await;
                if let Some((id, payload)) = inner.events.get(self.cursor) {
                    let result = (id.clone(), payload.clone());
                    self.cursor += 1;
                    return Some(result);
                }
            }
            self.inner.read().await.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sink_sees_events_published_after_it_attaches() {
        let stream = InMemoryStream::new();
        let mut sink = stream.new_sink("consumer", agent_runtime::SinkOptions::default()).await.unwrap();
        stream.add("call", serde_json::json!({"tool": "svc.ts.echo"})).await.unwrap();
        let (_, payload) = sink.next().await.unwrap();
        assert_eq!(payload["event"], "call");
    }

    #[tokio::test]
    async fn sink_replays_from_zero_by_default() {
        let stream = InMemoryStream::new();
        stream.add("call", serde_json::json!(1)).await.unwrap();
        stream.add("call", serde_json::json!(2)).await.unwrap();
        let mut sink = stream.new_sink("late", agent_runtime::SinkOptions::default()).await.unwrap();
        let (_, first) = sink.next().await.unwrap();
        assert_eq!(first["payload"], 1);
    }

    #[tokio::test]
    async fn destroy_clears_events() {
        let stream = InMemoryStream::new();
        stream.add("call", serde_json::json!(1)).await.unwrap();
        stream.destroy("consumer").await.unwrap();
        assert_eq!(stream.inner.read().await.events.len(), 0);
    }
}
