//! The capability a concrete registry backend (HTTP catalogue, cluster
//! directory, static file) implements (spec.md §4.12).

use crate::types::{SearchHit, Toolset};
use async_trait::async_trait;

/// A registry backend failed to list, fetch, or search.
#[derive(Debug, Clone, thiserror::Error)]
#[error("registry `{registry}` error: {message}")]
pub struct RegistryError {
    /// The registry the error came from.
    pub registry: String,
    /// What went wrong.
    pub message: String,
}

/// Narrow capability a registry backend implements; the discovery
/// manager never depends on a concrete transport (spec.md §9
/// interface-over-inheritance).
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// List toolset names available from this registry, before filtering.
    async fn list(&self) -> Result<Vec<String>, RegistryError>;

    /// Fetch one toolset by name.
    async fn get(&self, name: &str) -> Result<Toolset, RegistryError>;

    /// Search this registry's catalogue, unfiltered and untagged; the
    /// discovery manager tags `Origin` and applies fan-out options.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, RegistryError>;
}
