//! Error classification and bounded exponential backoff for transport
//! calls (spec.md §4.9).

#![deny(missing_docs)]

use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// Whether an error is worth retrying.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Classification {
    /// Network timeout, DNS temporary failure, HTTP 429/502/503/504, or a
    /// context deadline exceeded — safe to retry.
    Retryable,
    /// Context cancellation or an HTTP 4xx other than 429 — retrying
    /// would not help.
    NonRetryable,
}

/// Classify a transport failure by HTTP status (when present) and whether
/// the underlying cause was a cancellation.
#[must_use]
pub fn classify(status: Option<u16>, cancelled: bool, timed_out: bool) -> Classification {
    if cancelled {
        return Classification::NonRetryable;
    }
    if timed_out {
        return Classification::Retryable;
    }
    match status {
        Some(429 | 502 | 503 | 504) => Classification::Retryable,
        Some(code) if (400..500).contains(&code) => Classification::NonRetryable,
        _ => Classification::Retryable,
    }
}

/// Configuration for [`backoff`].
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Multiplier applied per additional attempt.
    pub multiplier: f64,
    /// Ceiling on the computed delay, before jitter.
    pub max: Duration,
    /// Fractional jitter applied symmetrically around the computed delay.
    pub jitter: f64,
    /// Maximum number of attempts before giving up.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(200),
            multiplier: 2.0,
            max: Duration::from_secs(30),
            jitter: 0.2,
            max_attempts: 5,
        }
    }
}

/// Compute the delay before the `attempt`-th retry (1-indexed), as
/// `initial * multiplier^(attempt-1)`, capped at `max`, with symmetric
/// jitter of `±jitter * backoff` applied.
#[must_use]
pub fn backoff(config: &BackoffConfig, attempt: u32) -> Duration {
    let exp = config.multiplier.powi(attempt.saturating_sub(1) as i32);
    let raw = (config.initial.as_secs_f64() * exp).min(config.max.as_secs_f64());
    let jitter_span = raw * config.jitter;
    let delta = rand::thread_rng().gen_range(-jitter_span..=jitter_span);
    Duration::from_secs_f64((raw + delta).max(0.0))
}

/// All retries were exhausted without success.
#[derive(Debug, Clone, thiserror::Error)]
#[error("retry exhausted after {attempts} attempts over {total_duration:?}: {last_error}")]
pub struct ExhaustedError {
    /// Number of attempts made.
    pub attempts: u32,
    /// Total wall-clock time spent retrying.
    pub total_duration: Duration,
    /// The last error encountered.
    pub last_error: String,
}

/// Retry an async operation under `config`, classifying each failure with
/// `classify`. Stops immediately on a [`Classification::NonRetryable`]
/// error (spec.md §8 invariant 11).
pub async fn retry<T, E, F, Fut>(
    config: &BackoffConfig,
    mut classify: impl FnMut(&E) -> Classification,
    mut op: F,
) -> Result<T, ExhaustedError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let started = tokio::time::Instant::now();
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let message = err.to_string();
                if classify(&err) == Classification::NonRetryable || attempt >= config.max_attempts {
                    return Err(ExhaustedError {
                        attempts: attempt,
                        total_duration: started.elapsed(),
                        last_error: message,
                    });
                }
                let delay = backoff(config, attempt);
                warn!(attempt, ?delay, error = %message, "retrying after failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// State for resuming a server-sent-event style stream across
/// disconnects (spec.md §4.9).
#[derive(Debug, Clone, Default)]
pub struct StreamReconnectState {
    /// The last event ID successfully processed, if the server supports
    /// resuming from one.
    pub last_event_id: Option<String>,
    /// Number of reconnect attempts since the last successful connection.
    pub reconnect_attempts: u32,
}

impl StreamReconnectState {
    /// Record a reconnect attempt.
    pub fn note_attempt(&mut self) {
        self.reconnect_attempts += 1;
    }

    /// Record a successful reconnect: clears the attempt counter but
    /// preserves `last_event_id`.
    pub fn note_reconnected(&mut self) {
        self.reconnect_attempts = 0;
    }

    /// Record the last event ID observed.
    pub fn note_event(&mut self, event_id: impl Into<String>) {
        self.last_event_id = Some(event_id.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rate_limit_and_server_errors_as_retryable() {
        for status in [429, 502, 503, 504] {
            assert_eq!(classify(Some(status), false, false), Classification::Retryable);
        }
    }

    #[test]
    fn classifies_other_4xx_as_non_retryable() {
        assert_eq!(classify(Some(404), false, false), Classification::NonRetryable);
        assert_eq!(classify(Some(400), false, false), Classification::NonRetryable);
    }

    #[test]
    fn cancellation_always_non_retryable() {
        assert_eq!(classify(Some(429), true, false), Classification::NonRetryable);
    }

    #[test]
    fn backoff_never_exceeds_max_plus_jitter() {
        let config = BackoffConfig { max: Duration::from_secs(1), jitter: 0.5, ..BackoffConfig::default() };
        for attempt in 1..10 {
            let delay = backoff(&config, attempt);
            assert!(delay <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn reconnect_state_preserves_last_event_id_across_reset() {
        let mut state = StreamReconnectState::default();
        state.note_event("evt-7");
        state.note_attempt();
        state.note_attempt();
        assert_eq!(state.reconnect_attempts, 2);
        state.note_reconnected();
        assert_eq!(state.reconnect_attempts, 0);
        assert_eq!(state.last_event_id.as_deref(), Some("evt-7"));
    }

    #[tokio::test]
    async fn retry_stops_on_non_retryable_without_sleeping() {
        let config = BackoffConfig::default();
        let mut calls = 0;
        let result: Result<(), _> = retry(
            &config,
            |_: &&str| Classification::NonRetryable,
            || {
                calls += 1;
                async { Err("boom") }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let config = BackoffConfig { initial: Duration::from_millis(1), max: Duration::from_millis(2), ..BackoffConfig::default() };
        let mut attempts = 0;
        let result = retry(
            &config,
            |_: &&str| Classification::Retryable,
            || {
                attempts += 1;
                async move {
                    if attempts < 3 {
                        Err("transient")
                    } else {
                        Ok(42)
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts, 3);
    }
}
