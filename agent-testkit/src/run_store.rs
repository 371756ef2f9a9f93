//! In-memory [`RunStore`], keyed by `RunId`.

use agent_core::id::RunId;
use agent_core::run::RunState;
use agent_runtime::{RunStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// `HashMap`-backed run store for unit and integration tests.
pub struct InMemoryRunStore {
    states: RwLock<HashMap<String, RunState>>,
}

impl InMemoryRunStore {
    /// Start an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { states: RwLock::new(HashMap::new()) }
    }
}

impl Default for InMemoryRunStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn upsert(&self, state: &RunState) -> Result<(), StoreError> {
        let mut states = self.states.write().await;
        states.insert(state.run_id.as_str().to_string(), state.clone());
        Ok(())
    }

    async fn load(&self, run_id: &RunId) -> Result<Option<RunState>, StoreError> {
        let states = self.states.read().await;
        Ok(states.get(run_id.as_str()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::id::{AgentId, SessionId};
    use agent_core::plan::Usage;
    use agent_core::run::RunStatus;
    use std::time::SystemTime;

    fn state(run_id: &str) -> RunState {
        RunState {
            run_id: RunId::new(run_id),
            agent_id: AgentId::new("a1"),
            session_id: SessionId::new("s1"),
            status: RunStatus::Running,
            started_at: SystemTime::UNIX_EPOCH,
            updated_at: SystemTime::UNIX_EPOCH,
            usage: Usage::default(),
            turn_count: 0,
        }
    }

    #[tokio::test]
    async fn upsert_then_load_round_trips() {
        let store = InMemoryRunStore::new();
        store.upsert(&state("r1")).await.unwrap();
        let loaded = store.load(&RunId::new("r1")).await.unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Running);
    }

    #[tokio::test]
    async fn missing_run_loads_none() {
        let store = InMemoryRunStore::new();
        assert!(store.load(&RunId::new("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_overwrites_prior_state() {
        let store = InMemoryRunStore::new();
        store.upsert(&state("r1")).await.unwrap();
        let mut updated = state("r1");
        updated.status = RunStatus::Completed;
        store.upsert(&updated).await.unwrap();
        let loaded = store.load(&RunId::new("r1")).await.unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Completed);
    }
}
