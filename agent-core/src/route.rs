//! Late-binding references used to start or inline-invoke an agent across
//! processes (spec.md §3).

use crate::id::{AgentId, TaskQueue, WorkflowName};
use serde::{Deserialize, Serialize};

/// Where to route a request addressed to an [`AgentId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRoute {
    /// The agent this route addresses.
    pub agent_id: AgentId,
    /// Name of the workflow type that backs this agent.
    pub workflow_name: WorkflowName,
    /// Task queue the workflow is dispatched on by default.
    pub default_task_queue: TaskQueue,
}
