//! Adaptive (AIMD) tokens-per-minute rate limiting for model-client calls
//! (spec.md §4.3).

#![deny(missing_docs)]

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::debug;

/// Minimum token estimate for any call, regardless of text length.
pub const MIN_TOKEN_ESTIMATE: u64 = 500;

/// Estimate the token cost of a request: roughly one token per three
/// characters plus a fixed overhead, floored at [`MIN_TOKEN_ESTIMATE`].
#[must_use]
pub fn estimate_tokens(text_len: usize, overhead: u64) -> u64 {
    let chars = (text_len as u64) / 3 + overhead;
    chars.max(MIN_TOKEN_ESTIMATE)
}

/// Configuration for an [`AimdLimiter`].
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    /// Starting tokens-per-minute budget.
    pub initial_tpm: u64,
    /// Ceiling the budget may grow to on repeated success.
    pub max_tpm: u64,
    /// Additive increase applied per successful call, up to `max_tpm`.
    pub recovery_step: u64,
}

impl LimiterConfig {
    /// The floor the budget may shrink to: 10% of `initial_tpm`, at least 1.
    #[must_use]
    pub fn min_tpm(&self) -> u64 {
        (self.initial_tpm / 10).max(1)
    }
}

/// A shared, replicated store for the current TPM value, used to
/// coordinate rate limiting across a cluster of processes. A single
/// local instance needs no implementation of this; see
/// [`AimdLimiter::new`].
#[async_trait]
pub trait SharedLimitStore: Send + Sync {
    /// Read the cluster-wide current TPM, if one has been published.
    async fn get(&self) -> Option<u64>;

    /// Bounded (3-try) test-and-set: replace `cur` with `next` only if
    /// the stored value still equals `cur`. Returns `true` on success.
    async fn compare_and_set(&self, cur: u64, next: u64) -> bool;
}

/// AIMD token-bucket rate limiter.
///
/// On every call: estimate tokens from the request and wait for that
/// many tokens from the bucket. On success, additively increase the
/// budget up to `max_tpm`. On a rate-limit error, multiplicatively halve
/// the budget down to `min_tpm`. Thread-safe: the current-TPM mutation
/// path is a single mutex per local instance, while the bucket itself
/// allows concurrent `acquire`s.
pub struct AimdLimiter {
    config: LimiterConfig,
    current_tpm: Mutex<u64>,
    bucket: Semaphore,
    last_refill: Mutex<Instant>,
    shared: Option<Box<dyn SharedLimitStore>>,
}

impl AimdLimiter {
    /// Build a limiter with no cluster coordination.
    #[must_use]
    pub fn new(config: LimiterConfig) -> Self {
        let initial = config.initial_tpm;
        Self {
            config,
            current_tpm: Mutex::new(initial),
            bucket: Semaphore::new(initial as usize),
            last_refill: Mutex::new(Instant::now()),
            shared: None,
        }
    }

    /// Build a limiter that additionally coordinates its current TPM
    /// through a cluster-wide [`SharedLimitStore`].
    #[must_use]
    pub fn with_shared_store(config: LimiterConfig, store: Box<dyn SharedLimitStore>) -> Self {
        let initial = config.initial_tpm;
        Self {
            config,
            current_tpm: Mutex::new(initial),
            bucket: Semaphore::new(initial as usize),
            last_refill: Mutex::new(Instant::now()),
            shared: Some(store),
        }
    }

    /// Current tokens-per-minute budget.
    #[must_use]
    pub fn current_tpm(&self) -> u64 {
        *self.current_tpm.lock().expect("lock poisoned")
    }

    /// Top up the bucket with whatever fraction of `current_tpm` has
    /// accrued since the last refill, capped so the bucket never holds
    /// more than one minute's budget at once.
    fn refill(&self) {
        let cap = self.current_tpm() as usize;
        let available = self.bucket.available_permits();
        if available >= cap {
            *self.last_refill.lock().expect("lock poisoned") = Instant::now();
            return;
        }
        let mut last = self.last_refill.lock().expect("lock poisoned");
        let now = Instant::now();
        let elapsed = now.duration_since(*last);
        let accrued = (elapsed.as_secs_f64() / 60.0 * cap as f64).floor() as usize;
        let add = accrued.min(cap - available);
        if add > 0 {
            self.bucket.add_permits(add);
            *last = now;
        }
    }

    /// Estimate the request's token cost and wait for that many tokens
    /// to become available in the bucket, topping up from elapsed time
    /// on every call so the bucket actually replenishes under
    /// sustained use.
    pub async fn wait_for_tokens(&self, text_len: usize, overhead: u64) {
        self.refill();
        let cap = self.current_tpm().max(1);
        let needed = estimate_tokens(text_len, overhead).min(cap) as u32;
        if let Ok(permit) = self.bucket.acquire_many(needed).await {
            permit.forget();
        }
    }

    /// Record a successful call: additively increase the budget.
    pub async fn on_success(&self) {
        let mut guard = self.current_tpm.lock().expect("lock poisoned");
        let next = (*guard + self.config.recovery_step).min(self.config.max_tpm);
        if let Some(store) = &self.shared {
            if try_cas(store.as_ref(), *guard, next).await {
                *guard = next;
            } else if let Some(remote) = store.get().await {
                *guard = remote;
            }
        } else {
            *guard = next;
        }
        debug!(tpm = *guard, "rate limit recovered");
    }

    /// Record a rate-limit error: multiplicatively halve the budget.
    pub async fn on_rate_limit_error(&self) {
        let mut guard = self.current_tpm.lock().expect("lock poisoned");
        let floor = self.config.min_tpm();
        let next = (*guard / 2).max(floor);
        if let Some(store) = &self.shared {
            if try_cas(store.as_ref(), *guard, next).await {
                *guard = next;
            } else if let Some(remote) = store.get().await {
                *guard = remote;
            }
        } else {
            *guard = next;
        }
        debug!(tpm = *guard, "rate limit backed off");
    }
}

async fn try_cas(store: &dyn SharedLimitStore, cur: u64, next: u64) -> bool {
    for _ in 0..3 {
        if store.compare_and_set(cur, next).await {
            return true;
        }
    }
    false
}

/// How long a caller should expect to wait for `needed` tokens given the
/// current budget, useful for surfacing backoff hints without blocking.
#[must_use]
pub fn estimated_wait(current_tpm: u64, needed: u64) -> Duration {
    if current_tpm == 0 || needed <= current_tpm {
        return Duration::ZERO;
    }
    let minutes = needed as f64 / current_tpm as f64;
    Duration::from_secs_f64(minutes * 60.0)
}
