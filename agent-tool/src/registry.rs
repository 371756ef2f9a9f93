//! Process-scoped, append-only registry from [`Identifier`] to [`ToolSpec`]
//! (spec.md §4.1).

use agent_core::{Identifier, ToolSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// Registering the same tool name twice.
#[derive(Debug, Clone, thiserror::Error)]
#[error("tool `{0}` is already registered")]
pub struct DuplicateToolError(pub String);

/// Builds a [`ToolRegistry`]. Registration is append-only; attempting to
/// register a name twice is an error (spec.md §4.1).
#[derive(Debug, Default)]
pub struct ToolRegistryBuilder {
    specs: HashMap<String, Arc<ToolSpec>>,
}

impl ToolRegistryBuilder {
    /// Start an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool spec.
    pub fn register(&mut self, spec: ToolSpec) -> Result<(), DuplicateToolError> {
        let key = spec.name.as_str().to_string();
        if self.specs.contains_key(&key) {
            return Err(DuplicateToolError(key));
        }
        self.specs.insert(key, Arc::new(spec));
        Ok(())
    }

    /// Freeze the builder into a read-only registry. After this point
    /// lookups require no locking (publish-once pattern).
    #[must_use]
    pub fn build(self) -> ToolRegistry {
        ToolRegistry { specs: self.specs }
    }
}

/// Read-only, lock-free lookup table from [`Identifier`] to [`ToolSpec`],
/// published once at `Runtime` construction.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    specs: HashMap<String, Arc<ToolSpec>>,
}

impl ToolRegistry {
    /// Look up a tool's spec by its identifier.
    #[must_use]
    pub fn get(&self, name: &Identifier) -> Option<&Arc<ToolSpec>> {
        self.specs.get(name.as_str())
    }

    /// The aggregated list of specs, as presented to planners as the
    /// advertised tool universe.
    #[must_use]
    pub fn specs(&self) -> Vec<Arc<ToolSpec>> {
        self.specs.values().cloned().collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::spec::TypeSpec;

    fn sample_spec(name: &str) -> ToolSpec {
        ToolSpec {
            name: Identifier::parse(name).unwrap(),
            toolset: "svc.ts".into(),
            payload: TypeSpec { name: "Payload".into(), schema: b"{}".to_vec(), codec_name: "json".into() },
            result: TypeSpec { name: "Result".into(), schema: b"{}".to_vec(), codec_name: "json".into() },
            sidecar: None,
            description: "test tool".into(),
            tags: vec![],
            bounded_result: false,
            is_agent_tool: false,
            agent_route: None,
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut builder = ToolRegistryBuilder::new();
        builder.register(sample_spec("svc.ts.echo")).unwrap();
        let err = builder.register(sample_spec("svc.ts.echo")).unwrap_err();
        assert_eq!(err.0, "svc.ts.echo");
    }

    #[test]
    fn build_exposes_all_registered_specs() {
        let mut builder = ToolRegistryBuilder::new();
        builder.register(sample_spec("svc.ts.echo")).unwrap();
        builder.register(sample_spec("svc.ts.fetch")).unwrap();
        let registry = builder.build();
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&Identifier::parse("svc.ts.echo").unwrap()).is_some());
        assert!(registry.get(&Identifier::parse("svc.ts.missing").unwrap()).is_none());
    }
}
