//! The `Runtime`: owns the process-scoped tool-spec and toolset
//! registration maps, populated at construction and read-only thereafter
//! (spec.md §3 "Ownership", §9 "Global mutable state").

use agent_tool::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// The activity timeout applied when a tool spec does not name a more
/// specific one, matching the teacher's `DEFAULT_ACTIVITY_TIMEOUT`.
pub const DEFAULT_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Process-wide configuration for a [`Runtime`]. Derives `Default` +
/// `Serialize`/`Deserialize` so a host application can load it from
/// whatever config source it chooses (spec.md SPEC_FULL §1
/// "Configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Default per-activity timeout when a tool spec does not override it.
    #[serde(with = "duration_secs")]
    pub default_activity_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { default_activity_timeout: DEFAULT_ACTIVITY_TIMEOUT }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

/// Owns the immutable, publish-once registries constructed at process
/// start: the tool-spec registry and the set of toolsets that currently
/// have a live remote caller via the gateway.
pub struct Runtime {
    config: RuntimeConfig,
    tools: Arc<ToolRegistry>,
    remote_toolsets: HashSet<String>,
}

impl Runtime {
    /// Construct a runtime over an already-frozen tool registry and the
    /// set of toolsets routed through the gateway.
    #[must_use]
    pub fn new(config: RuntimeConfig, tools: Arc<ToolRegistry>, remote_toolsets: HashSet<String>) -> Self {
        Self { config, tools, remote_toolsets }
    }

    /// The runtime's configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The frozen tool-spec registry.
    #[must_use]
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// True if `toolset` currently has a live caller registered through
    /// the gateway.
    #[must_use]
    pub fn has_remote_caller(&self, toolset: &str) -> bool {
        self.remote_toolsets.contains(toolset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let config = RuntimeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.default_activity_timeout, DEFAULT_ACTIVITY_TIMEOUT);
    }

    #[test]
    fn runtime_reports_remote_toolsets() {
        let tools = Arc::new(agent_tool::ToolRegistryBuilder::new().build());
        let mut remote = HashSet::new();
        remote.insert("svc.ts".to_string());
        let runtime = Runtime::new(RuntimeConfig::default(), tools, remote);
        assert!(runtime.has_remote_caller("svc.ts"));
        assert!(!runtime.has_remote_caller("other.ts"));
    }
}
