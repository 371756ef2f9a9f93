//! Shared vocabulary for registry discovery: toolsets, search hits, and
//! the include/exclude filters applied during background sync (spec.md
//! §4.12).

use agent_core::ToolSpec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A toolset fetched from a registry, stamped with the registry it came
/// from.
#[derive(Debug, Clone)]
pub struct Toolset {
    /// The registry this toolset was fetched from.
    pub origin: String,
    /// The toolset's name, as addressed in `DiscoverToolset`.
    pub name: String,
    /// The tools the toolset exposes.
    pub specs: Vec<Arc<ToolSpec>>,
}

/// One result from a registry search, tagged with its source registry
/// once merged across a federation (spec.md §8 invariant 10: Origin
/// tagging).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The toolset or tool key that matched.
    pub key: String,
    /// Relevance score; higher is more relevant.
    pub score: f64,
    /// Preview/snippet of the matched content, if the registry supplies one.
    pub snippet: Option<String>,
    /// The registry this hit was fetched from.
    pub origin: String,
}

/// Include/exclude glob filters applied to toolset names discovered via
/// background sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Federation {
    /// A name must match at least one of these globs (empty = match all).
    #[serde(default)]
    pub include: Vec<String>,
    /// A name matching any of these globs is dropped even if included.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Federation {
    /// True if `name` survives this federation's include/exclude filters.
    #[must_use]
    pub fn admits(&self, name: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|pat| crate::glob::glob_match(pat, name));
        let excluded = self.exclude.iter().any(|pat| crate::glob::glob_match(pat, name));
        included && !excluded
    }
}

/// Per-registry configuration: how long cached entries stay fresh, how
/// often to background-sync, and which toolset names to admit.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// The registry's name, used as `Origin` and in the cache key.
    pub name: String,
    /// How long a cached entry is served without re-querying the client.
    pub ttl: Duration,
    /// Background sync interval; `None` disables sync for this registry.
    pub sync_interval: Option<Duration>,
    /// Include/exclude filters applied during background sync.
    pub federation: Federation,
}

/// Search tuning applied after merging hits across registries.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Drop hits scoring below this relevance.
    pub min_relevance: f64,
    /// Keep at most this many hits after sorting.
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { min_relevance: 0.0, max_results: usize::MAX }
    }
}
