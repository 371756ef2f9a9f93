//! Typed identifier wrappers for the run/turn/tool-call/agent namespace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed IDs prevent mixing up a run ID for a turn ID, etc. They are
/// plain strings underneath — no UUID enforcement, no format requirement.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(
            #[doc = "The underlying string value."]
            pub String,
        );

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(RunId, "Unique identifier for a workflow run.");
typed_id!(SessionId, "Unique identifier for a conversation session.");
typed_id!(TurnId, "Unique identifier for a turn within a run.");
typed_id!(ToolCallId, "Deterministic identifier for a single tool call.");
typed_id!(AgentId, "Unique identifier for an agent definition.");
typed_id!(WorkflowName, "Name of the workflow type that backs an agent route.");
typed_id!(TaskQueue, "Task queue an agent route is dispatched on.");

impl RunId {
    /// Derive the `RunID` of a nested agent invoked via an agent-tool,
    /// per spec.md 4.10: `RunID = nest(parentRunID, toolName)`.
    #[must_use]
    pub fn nest(&self, tool_name: &str) -> RunId {
        RunId(format!("{}/{}", self.0, tool_name))
    }
}

impl ToolCallId {
    /// Derive a deterministic tool-call ID from `(RunID, TurnID, toolName, sequence)`.
    ///
    /// Same inputs always produce the same ID, so workflow replay reproduces
    /// identical identifiers (spec.md 8, invariant 2).
    #[must_use]
    pub fn derive(run: &RunId, turn: &TurnId, tool_name: &str, sequence: usize) -> ToolCallId {
        ToolCallId(format!("{}:{}:{}:{}", run.0, turn.0, tool_name, sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nest_is_deterministic_and_distinguishes_tools() {
        let parent = RunId::new("run-1");
        assert_eq!(parent.nest("search"), parent.nest("search"));
        assert_ne!(parent.nest("search"), parent.nest("fetch"));
    }

    #[test]
    fn tool_call_id_is_deterministic() {
        let run = RunId::new("run-1");
        let turn = TurnId::new("turn-1");
        let a = ToolCallId::derive(&run, &turn, "svc.ts.echo", 0);
        let b = ToolCallId::derive(&run, &turn, "svc.ts.echo", 0);
        assert_eq!(a, b);
        let c = ToolCallId::derive(&run, &turn, "svc.ts.echo", 1);
        assert_ne!(a, c);
    }

    #[test]
    fn display_round_trips_inner_string() {
        let id = AgentId::new("triage-agent");
        assert_eq!(id.to_string(), "triage-agent");
        assert_eq!(id.as_str(), "triage-agent");
    }
}
