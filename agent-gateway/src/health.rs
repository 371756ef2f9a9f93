//! Per-toolset liveness state machine and the distributed ticker that
//! drives it (spec.md §4.7).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Lifecycle of a toolset as observed by the gateway: `unknown →
/// registered → unhealthy ↔ healthy → unregistered`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ToolsetHealth {
    /// Never registered.
    Unknown,
    /// Registered, no ping round-trip completed yet.
    Registered,
    /// Answering pings within the missed-pong threshold.
    Healthy,
    /// Missed `M` consecutive pongs.
    Unhealthy,
    /// Explicitly unregistered.
    Unregistered,
}

/// A cluster-wide, event-driven store for toolset health, implemented by
/// whatever replicated-map technology the host provides (spec.md §5
/// "Replicated map subscriptions").
#[async_trait]
pub trait SharedHealthMap: Send + Sync {
    /// Record that `toolset` answered `ping_id`.
    async fn record_pong(&self, toolset: &str, ping_id: &str);

    /// Read the last ping id a toolset answered, if any.
    async fn last_pong(&self, toolset: &str) -> Option<String>;
}

struct ToolsetState {
    health: ToolsetHealth,
    last_ping_id: Option<String>,
    awaiting_pong: bool,
    consecutive_missed: u32,
    last_pong_at: Option<Instant>,
}

/// Tracks health transitions for every registered toolset and decides,
/// on each tick, whether a toolset has become unhealthy.
pub struct HealthTracker {
    missed_pong_threshold: u32,
    states: Mutex<HashMap<String, ToolsetState>>,
}

impl HealthTracker {
    /// Build a tracker that declares a toolset unhealthy after `M`
    /// consecutive missed pongs.
    #[must_use]
    pub fn new(missed_pong_threshold: u32) -> Self {
        Self { missed_pong_threshold, states: Mutex::new(HashMap::new()) }
    }

    /// Register a toolset for health tracking (idempotent: re-registering
    /// refreshes state without duplicating it).
    pub fn register(&self, toolset: &str) {
        let mut states = self.states.lock().expect("lock poisoned");
        states
            .entry(toolset.to_string())
            .and_modify(|s| {
                if s.health == ToolsetHealth::Unregistered {
                    s.health = ToolsetHealth::Registered;
                }
            })
            .or_insert(ToolsetState {
                health: ToolsetHealth::Registered,
                last_ping_id: None,
                awaiting_pong: false,
                consecutive_missed: 0,
                last_pong_at: None,
            });
        info!(toolset, "toolset registered for health tracking");
    }

    /// Mark a toolset unregistered; it stops participating in ticks.
    pub fn unregister(&self, toolset: &str) {
        let mut states = self.states.lock().expect("lock poisoned");
        if let Some(state) = states.get_mut(toolset) {
            state.health = ToolsetHealth::Unregistered;
        }
    }

    /// Current health of a toolset.
    #[must_use]
    pub fn health(&self, toolset: &str) -> ToolsetHealth {
        self.states.lock().expect("lock poisoned").get(toolset).map_or(ToolsetHealth::Unknown, |s| s.health)
    }

    /// Record that a ping was sent for `toolset`.
    pub fn note_ping_sent(&self, toolset: &str, ping_id: &str) {
        let mut states = self.states.lock().expect("lock poisoned");
        if let Some(state) = states.get_mut(toolset) {
            state.last_ping_id = Some(ping_id.to_string());
            state.awaiting_pong = true;
        }
    }

    /// Record a pong received for `toolset`, transitioning it to healthy
    /// and resetting the missed-pong counter.
    pub fn note_pong_received(&self, toolset: &str, ping_id: &str) {
        let mut states = self.states.lock().expect("lock poisoned");
        if let Some(state) = states.get_mut(toolset) {
            if state.last_ping_id.as_deref() == Some(ping_id) {
                state.consecutive_missed = 0;
                state.awaiting_pong = false;
                state.last_pong_at = Some(Instant::now());
                state.health = ToolsetHealth::Healthy;
            }
        }
    }

    /// Check every registered (non-unregistered) toolset for a missed
    /// pong since the last ping and transition it to unhealthy after
    /// `missed_pong_threshold` consecutive misses. Call once per ping
    /// cycle, after sending pings and allowing one round-trip window.
    pub fn sweep_missed(&self) {
        let mut states = self.states.lock().expect("lock poisoned");
        for (toolset, state) in states.iter_mut() {
            if state.health == ToolsetHealth::Unregistered || state.health == ToolsetHealth::Unknown {
                continue;
            }
            if state.awaiting_pong {
                state.consecutive_missed += 1;
                if state.consecutive_missed >= self.missed_pong_threshold {
                    if state.health != ToolsetHealth::Unhealthy {
                        warn!(toolset, "toolset marked unhealthy after missed pongs");
                    }
                    state.health = ToolsetHealth::Unhealthy;
                }
            }
        }
    }
}

/// Configuration for the distributed ping ticker (spec.md §8 invariant 7).
#[derive(Debug, Clone)]
pub struct TickerConfig {
    /// How often pings are published per registered toolset.
    pub ping_interval: Duration,
    /// Worker time-to-live used to size the liveness recovery window.
    pub worker_ttl: Duration,
}

impl TickerConfig {
    /// Upper bound within which pings must continue after any one
    /// gateway node crashes (spec.md §8 invariant 7).
    #[must_use]
    pub fn failover_bound(&self) -> Duration {
        self.ping_interval * 2 + self.worker_ttl
    }
}
