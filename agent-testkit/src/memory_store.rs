//! In-memory [`MemoryStore`], appending events per `RunId`.

use agent_core::id::RunId;
use agent_runtime::{MemoryStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// `HashMap`-backed conversation-event store for unit and integration
/// tests.
pub struct InMemoryMemoryStore {
    events: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryMemoryStore {
    /// Start an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { events: RwLock::new(HashMap::new()) }
    }
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn load_run(&self, run_id: &RunId) -> Result<Vec<Value>, StoreError> {
        let events = self.events.read().await;
        Ok(events.get(run_id.as_str()).cloned().unwrap_or_default())
    }

    async fn append_events(&self, run_id: &RunId, new_events: Vec<Value>) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        events.entry(run_id.as_str().to_string()).or_default().extend(new_events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appended_events_accumulate_in_order() {
        let store = InMemoryMemoryStore::new();
        let run_id = RunId::new("r1");
        store.append_events(&run_id, vec![serde_json::json!(1)]).await.unwrap();
        store.append_events(&run_id, vec![serde_json::json!(2)]).await.unwrap();
        let loaded = store.load_run(&run_id).await.unwrap();
        assert_eq!(loaded, vec![serde_json::json!(1), serde_json::json!(2)]);
    }

    #[tokio::test]
    async fn unknown_run_loads_empty() {
        let store = InMemoryMemoryStore::new();
        assert!(store.load_run(&RunId::new("missing")).await.unwrap().is_empty());
    }
}
