//! Per-turn and per-run caps enforced by the policy layer (spec.md §3, §4.5).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Caps applied to a single run. Counters tracked against a `Budgets`
/// value are private to the run that owns them; `Budgets` itself is
/// immutable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budgets {
    /// Maximum tool calls a single planner turn may issue before surplus
    /// calls are synthesized as errors.
    pub per_turn_max_tool_calls: usize,
    /// Maximum tool calls across the whole run before it terminates.
    pub run_max_tool_calls: usize,
    /// Maximum consecutive tool-call failures before the run terminates;
    /// resets on any success.
    pub max_consecutive_failed_tool_calls: usize,
    /// Wall-clock budget for the run, computed once at start into a
    /// monotonic deadline.
    pub time_budget: Duration,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            per_turn_max_tool_calls: 8,
            run_max_tool_calls: 64,
            max_consecutive_failed_tool_calls: 5,
            time_budget: Duration::from_secs(600),
        }
    }
}

/// Mutable, run-private counters checked against a [`Budgets`] ceiling.
#[derive(Debug, Clone, Default)]
pub struct BudgetCounters {
    /// Total tool calls executed so far this run.
    pub used_tool_calls: usize,
    /// Consecutive tool-call failures since the last success.
    pub consecutive_failures: usize,
}

impl BudgetCounters {
    /// Record a successful tool call, incrementing the total and
    /// resetting the consecutive-failure streak.
    pub fn record_success(&mut self) {
        self.used_tool_calls += 1;
        self.consecutive_failures = 0;
    }

    /// Record a failed tool call, incrementing both the total and the
    /// consecutive-failure streak.
    pub fn record_failure(&mut self) {
        self.used_tool_calls += 1;
        self.consecutive_failures += 1;
    }

    /// True if `used_tool_calls` has reached the run-wide cap.
    #[must_use]
    pub fn run_cap_exceeded(&self, budgets: &Budgets) -> bool {
        self.used_tool_calls >= budgets.run_max_tool_calls
    }

    /// True if the consecutive-failure streak has reached the cap.
    #[must_use]
    pub fn failure_cap_exceeded(&self, budgets: &Budgets) -> bool {
        self.consecutive_failures >= budgets.max_consecutive_failed_tool_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_resets_consecutive_failures() {
        let mut counters = BudgetCounters::default();
        counters.record_failure();
        counters.record_failure();
        assert_eq!(counters.consecutive_failures, 2);
        counters.record_success();
        assert_eq!(counters.consecutive_failures, 0);
        assert_eq!(counters.used_tool_calls, 3);
    }

    #[test]
    fn caps_are_monotonic_and_exclusive() {
        let budgets = Budgets {
            run_max_tool_calls: 2,
            max_consecutive_failed_tool_calls: 2,
            ..Budgets::default()
        };
        let mut counters = BudgetCounters::default();
        assert!(!counters.run_cap_exceeded(&budgets));
        counters.record_failure();
        assert!(!counters.run_cap_exceeded(&budgets));
        assert!(!counters.failure_cap_exceeded(&budgets));
        counters.record_failure();
        assert!(counters.run_cap_exceeded(&budgets));
        assert!(counters.failure_cap_exceeded(&budgets));
    }
}
