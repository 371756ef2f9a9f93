//! Priority-tiered guidance snippets injected into a planner input
//! (spec.md §4.4).

#![deny(missing_docs)]

use agent_core::id::RunId;
use agent_core::plan::{Message, RenderedReminder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// How urgently a reminder should be surfaced; higher priority reminders
/// sort first in [`ReminderEngine::snapshot`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Priority {
    /// Lowest priority: ambient context.
    Info,
    /// General behavioral guidance.
    Guidance,
    /// Highest priority: must not be dropped silently.
    Safety,
}

/// When during a run a reminder is eligible to fire.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Attachment {
    /// Only on the run's very first turn.
    RunStart,
    /// On any turn following fresh user input.
    UserTurn,
    /// On any turn following a tool result.
    ToolTurn,
}

/// A configured reminder definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    /// Stable identifier.
    pub id: String,
    /// The text to inject.
    pub text: String,
    /// Priority tier.
    pub priority: Priority,
    /// Maximum number of times this reminder may be emitted in one run.
    pub max_per_run: usize,
    /// Minimum number of turns that must elapse between emissions.
    pub min_turns_between: usize,
    /// When this reminder is eligible to fire.
    pub attachment: Attachment,
}

#[derive(Debug, Clone, Default)]
struct EmitState {
    emit_count: usize,
    last_emitted_turn: Option<usize>,
}

/// Tracks per-run emission state for a fixed set of configured reminders
/// and decides, turn by turn, which are currently eligible.
#[derive(Debug, Default)]
pub struct ReminderEngine {
    reminders: Vec<Reminder>,
    state: HashMap<(RunId, String), EmitState>,
}

impl ReminderEngine {
    /// Build an engine over a fixed set of reminder definitions.
    #[must_use]
    pub fn new(reminders: Vec<Reminder>) -> Self {
        Self { reminders, state: HashMap::new() }
    }

    /// Currently eligible reminders for `run_id` at `turn`, for the given
    /// `attachment` point, sorted by descending priority. Does not mark
    /// them emitted — call [`Self::mark_emitted`] for each one actually
    /// used.
    #[must_use]
    pub fn snapshot(&self, run_id: &RunId, turn: usize, attachment: Attachment) -> Vec<RenderedReminder> {
        let mut eligible: Vec<&Reminder> = self
            .reminders
            .iter()
            .filter(|r| r.attachment == attachment)
            .filter(|r| {
                let state = self.state.get(&(run_id.clone(), r.id.clone()));
                let count = state.map_or(0, |s| s.emit_count);
                if count >= r.max_per_run {
                    return false;
                }
                match state.and_then(|s| s.last_emitted_turn) {
                    Some(last) => turn.saturating_sub(last) >= r.min_turns_between,
                    None => true,
                }
            })
            .collect();
        eligible.sort_by(|a, b| b.priority.cmp(&a.priority));
        eligible
            .into_iter()
            .map(|r| RenderedReminder { id: r.id.clone(), text: r.text.clone() })
            .collect()
    }

    /// Record that a reminder was actually emitted on `turn`, incrementing
    /// its emit count and stamping the last-emitted turn.
    pub fn mark_emitted(&mut self, run_id: &RunId, reminder_id: &str, turn: usize) {
        let entry = self.state.entry((run_id.clone(), reminder_id.to_string())).or_default();
        entry.emit_count += 1;
        entry.last_emitted_turn = Some(turn);
        debug!(run_id = %run_id, reminder_id, turn, "reminder emitted");
    }

    /// Place reminder attachments as additional system messages
    /// immediately after the lead system message, in priority order
    /// (spec.md §4.4).
    #[must_use]
    pub fn inject_messages(messages: Vec<Message>, reminders: &[RenderedReminder]) -> Vec<Message> {
        if reminders.is_empty() {
            return messages;
        }
        let mut out = Vec::with_capacity(messages.len() + reminders.len());
        let mut iter = messages.into_iter();
        if let Some(lead) = iter.next() {
            let is_system = lead.role == "system";
            out.push(lead);
            if is_system {
                for reminder in reminders {
                    out.push(Message { role: "system".to_string(), content: serde_json::json!(reminder.text) });
                }
            }
        }
        out.extend(iter);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn safety() -> Reminder {
        Reminder {
            id: "safety-1".into(),
            text: "never fabricate citations".into(),
            priority: Priority::Safety,
            max_per_run: 10,
            min_turns_between: 0,
            attachment: Attachment::RunStart,
        }
    }

    #[test]
    fn run_start_reminder_is_eligible_before_any_emission() {
        let engine = ReminderEngine::new(vec![safety()]);
        let run = RunId::new("r1");
        let eligible = engine.snapshot(&run, 0, Attachment::RunStart);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "safety-1");
    }

    #[test]
    fn max_per_run_cap_suppresses_further_emission() {
        let mut engine = ReminderEngine::new(vec![Reminder { max_per_run: 1, ..safety() }]);
        let run = RunId::new("r1");
        assert_eq!(engine.snapshot(&run, 0, Attachment::RunStart).len(), 1);
        engine.mark_emitted(&run, "safety-1", 0);
        assert_eq!(engine.snapshot(&run, 1, Attachment::RunStart).len(), 0);
    }

    #[test]
    fn min_turns_between_spacing_is_respected() {
        let mut engine = ReminderEngine::new(vec![Reminder {
            min_turns_between: 3,
            max_per_run: 10,
            ..safety()
        }]);
        let run = RunId::new("r1");
        engine.mark_emitted(&run, "safety-1", 5);
        assert!(engine.snapshot(&run, 6, Attachment::RunStart).is_empty());
        assert!(engine.snapshot(&run, 7, Attachment::RunStart).is_empty());
        assert_eq!(engine.snapshot(&run, 8, Attachment::RunStart).len(), 1);
    }

    #[test]
    fn higher_priority_sorts_first() {
        let engine = ReminderEngine::new(vec![
            Reminder { id: "info".into(), priority: Priority::Info, ..safety() },
            Reminder { id: "guidance".into(), priority: Priority::Guidance, ..safety() },
            safety(),
        ]);
        let run = RunId::new("r1");
        let eligible = engine.snapshot(&run, 0, Attachment::RunStart);
        assert_eq!(eligible[0].id, "safety-1");
        assert_eq!(eligible[1].id, "guidance");
        assert_eq!(eligible[2].id, "info");
    }

    #[test]
    fn injection_lands_right_after_lead_system_message() {
        let messages = vec![
            Message { role: "system".into(), content: serde_json::json!("you are helpful") },
            Message { role: "user".into(), content: serde_json::json!("hi") },
        ];
        let reminders = vec![RenderedReminder { id: "safety-1".into(), text: "be safe".into() }];
        let out = ReminderEngine::inject_messages(messages, &reminders);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].role, "system");
        assert_eq!(out[1].content, serde_json::json!("be safe"));
        assert_eq!(out[2].role, "user");
    }
}
