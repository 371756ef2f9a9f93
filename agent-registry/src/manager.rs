//! Multi-registry discovery manager: TTL caching on fetch, background
//! sync under federation filters, and relevance-sorted search fan-out
//! (spec.md §4.12).

use crate::cache::TtlCache;
use crate::client::{RegistryClient, RegistryError};
use crate::types::{RegistryConfig, SearchHit, SearchOptions, Toolset};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct Registry {
    config: RegistryConfig,
    client: Arc<dyn RegistryClient>,
}

/// Owns every configured registry's client and cache, and the background
/// sync tasks spawned for registries with a sync interval.
pub struct RegistrationDiscoveryManager {
    registries: Vec<Registry>,
    cache: Arc<TtlCache<Toolset>>,
    sync_tasks: Vec<JoinHandle<()>>,
}

impl Drop for RegistrationDiscoveryManager {
    fn drop(&mut self) {
        for task in &self.sync_tasks {
            task.abort();
        }
    }
}

fn cache_key(registry: &str, toolset: &str) -> String {
    format!("registry/{registry}/toolset/{toolset}")
}

impl RegistrationDiscoveryManager {
    /// Build a manager over `registries` and start background sync for
    /// any entry whose `sync_interval` is set.
    #[must_use]
    pub fn new(registries: Vec<(RegistryConfig, Arc<dyn RegistryClient>)>) -> Self {
        let cache = Arc::new(TtlCache::new());
        let mut manager_registries = Vec::with_capacity(registries.len());
        let mut sync_tasks = Vec::new();

        for (config, client) in registries {
            if config.sync_interval.is_some() {
                sync_tasks.push(spawn_sync_task(config.clone(), Arc::clone(&client), Arc::clone(&cache)));
            }
            manager_registries.push(Registry { config, client });
        }

        Self { registries: manager_registries, cache, sync_tasks }
    }

    /// Fetch `name` from `registry`, serving a cached copy while it is
    /// within the registry's TTL and propagating the client's error once
    /// the cache has gone stale (spec.md §8 invariant 9).
    ///
    /// # Errors
    /// Returns the registry's own error when the name is unknown or the
    /// client call fails and no fresh cache entry covers it.
    pub async fn discover_toolset(&self, registry: &str, name: &str) -> Result<Toolset, RegistryError> {
        let entry = self.registries.iter().find(|r| r.config.name == registry).ok_or_else(|| RegistryError {
            registry: registry.to_string(),
            message: "unknown registry".to_string(),
        })?;

        let key = cache_key(registry, name);
        if let Some(cached) = self.cache.fresh(&key, entry.config.ttl) {
            return Ok(cached);
        }

        let toolset = entry.client.get(name).await?;
        let stamped = Toolset { origin: registry.to_string(), ..toolset };
        self.cache.insert(key, stamped.clone());
        Ok(stamped)
    }

    /// Search every registry, tag each hit with its origin, merge,
    /// sort by descending relevance, then apply `options`.
    pub async fn search(&self, query: &str, options: SearchOptions) -> Vec<SearchHit> {
        let mut merged = Vec::new();
        for registry in &self.registries {
            match registry.client.search(query).await {
                Ok(hits) => merged.extend(hits.into_iter().map(|hit| SearchHit { origin: registry.config.name.clone(), ..hit })),
                Err(error) => warn!(registry = %registry.config.name, %error, "registry search failed"),
            }
        }
        merged.retain(|hit| hit.score >= options.min_relevance);
        merged.sort_by(|a, b| b.score.total_cmp(&a.score));
        merged.truncate(options.max_results);
        merged
    }
}

fn spawn_sync_task(config: RegistryConfig, client: Arc<dyn RegistryClient>, cache: Arc<TtlCache<Toolset>>) -> JoinHandle<()> {
    let Some(interval) = config.sync_interval else {
        unreachable!("spawn_sync_task is only called when sync_interval is Some");
    };
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            sync_once(&config, client.as_ref(), cache.as_ref()).await;
        }
    })
}

async fn sync_once(config: &RegistryConfig, client: &dyn RegistryClient, cache: &TtlCache<Toolset>) {
    let names = match client.list().await {
        Ok(names) => names,
        Err(error) => {
            warn!(registry = %config.name, %error, "background sync list failed");
            return;
        }
    };
    for name in names {
        if !config.federation.admits(&name) {
            debug!(registry = %config.name, toolset = %name, "excluded by federation filter");
            continue;
        }
        match client.get(&name).await {
            Ok(toolset) => {
                let stamped = Toolset { origin: config.name.clone(), ..toolset };
                cache.insert(cache_key(&config.name, &name), stamped);
            }
            Err(error) => warn!(registry = %config.name, toolset = %name, %error, "background sync get failed"),
        }
    }
}
