//! The per-turn plan/execute/resume state machine (spec.md §4.10).

use crate::config::LoopConfig;
use crate::error::LoopError;
use crate::hooks::{HookAction, HookEvent, ObservabilityHook};
use crate::signal::Signal;
use agent_core::id::{AgentId, RunId, SessionId};
use agent_core::plan::{AwaitKind, Message, PlanDecision, PlanInput, PlanResult, ToolChoice, Usage};
use agent_core::run::{RunOutcome, RunOutput, RunState, RunStatus};
use agent_core::{Identifier, ToolErrorInfo, ToolRequest, ToolResult};
use agent_ledger::Ledger;
use agent_reminders::{Attachment, ReminderEngine};
use agent_runtime::{MemoryStore, ModelClient, RunStore};
use agent_tool::dispatch::{synthesize_surplus_error, Dispatcher};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Transient, per-run state threaded through every turn. Factored out of
/// [`WorkflowLoop`] so the same turn logic drives both `run()`'s blocking
/// loop and a step-by-step [`crate::step::StepIterator`].
pub(crate) struct RunCursor {
    pub(crate) run_id: RunId,
    pub(crate) agent_id: AgentId,
    pub(crate) session_id: SessionId,
    pub(crate) messages: Vec<Message>,
    ledger: Ledger,
    counters: agent_core::BudgetCounters,
    turn: usize,
    pub(crate) next_attachment: Attachment,
    deadline: Instant,
    tool_events: Vec<agent_core::ToolEvent>,
    notes: Vec<String>,
    usage: Usage,
}

impl RunCursor {
    pub(crate) fn new(
        run_id: RunId,
        session_id: SessionId,
        agent_id: AgentId,
        user_message: Message,
        budgets: &agent_core::Budgets,
    ) -> Self {
        Self {
            run_id,
            agent_id,
            session_id,
            messages: vec![user_message],
            ledger: Ledger::new(),
            counters: agent_core::BudgetCounters::default(),
            turn: 0,
            next_attachment: Attachment::RunStart,
            deadline: Instant::now() + budgets.time_budget,
            tool_events: Vec::new(),
            notes: Vec::new(),
            usage: Usage::default(),
        }
    }
}

/// What one call to [`WorkflowLoop::advance`] produced.
pub(crate) enum TurnOutcome {
    /// Keep looping; the cursor already reflects the turn's effects.
    Continue,
    /// The planner asked to pause; the caller must resolve it with a
    /// signal before advancing again.
    Paused(AwaitKind),
    /// The run reached a terminal state.
    Terminal(RunOutput),
}

/// Drives one agent's workflow: calls the planner, enforces budgets and
/// tool-advertisement policy, dispatches tool calls, and appends every
/// step to the transcript ledger, per the per-turn algorithm in spec.md
/// §4.10.
pub struct WorkflowLoop {
    system_message: Message,
    planner: Arc<dyn ModelClient>,
    dispatcher: Arc<Dispatcher>,
    tool_specs: Arc<agent_tool::registry::ToolRegistry>,
    reminders: ReminderEngine,
    hooks: Vec<Arc<dyn ObservabilityHook>>,
    run_store: Option<Arc<dyn RunStore>>,
    memory_store: Option<Arc<dyn MemoryStore>>,
    config: LoopConfig,
}

impl WorkflowLoop {
    /// Build a loop for one agent definition.
    #[must_use]
    pub fn new(
        system_message: Message,
        planner: Arc<dyn ModelClient>,
        dispatcher: Arc<Dispatcher>,
        tool_specs: Arc<agent_tool::registry::ToolRegistry>,
        config: LoopConfig,
    ) -> Self {
        let reminders = ReminderEngine::new(config.reminders.clone());
        Self {
            system_message,
            planner,
            dispatcher,
            tool_specs,
            reminders,
            hooks: Vec::new(),
            run_store: None,
            memory_store: None,
            config,
        }
    }

    /// Register an observability hook, fired in registration order.
    pub fn add_hook(&mut self, hook: Arc<dyn ObservabilityHook>) {
        self.hooks.push(hook);
    }

    /// Persist run state transitions to a [`RunStore`].
    pub fn with_run_store(&mut self, store: Arc<dyn RunStore>) {
        self.run_store = Some(store);
    }

    /// Publish lifecycle events (`run_paused`, `run_cancelled`) to a
    /// [`MemoryStore`] alongside the run's transcript.
    pub fn with_memory_store(&mut self, store: Arc<dyn MemoryStore>) {
        self.memory_store = Some(store);
    }

    /// The budgets this loop enforces, for callers building a
    /// [`crate::step::StepIterator`] directly.
    #[must_use]
    pub(crate) fn budgets(&self) -> &agent_core::Budgets {
        &self.config.budgets
    }

    /// Drive a run to completion, blocking on `signals` whenever the
    /// planner pauses. Returns once the run reaches a terminal outcome.
    pub async fn run(
        &mut self,
        run_id: RunId,
        session_id: SessionId,
        agent_id: AgentId,
        user_message: Message,
        signals: &mut Receiver<Signal>,
        cancellation: CancellationToken,
    ) -> Result<RunOutput, LoopError> {
        let mut cursor = RunCursor::new(run_id, session_id, agent_id, user_message, &self.config.budgets);
        self.persist_state(&cursor, RunStatus::Running).await?;

        loop {
            if let Ok(Signal::Pause) = signals.try_recv() {
                if let Some(output) = self.wait_while_paused(&mut cursor, signals, &cancellation).await? {
                    return Ok(output);
                }
            }

            match self.advance(&mut cursor, &cancellation).await? {
                TurnOutcome::Continue => continue,
                TurnOutcome::Terminal(output) => return Ok(output),
                TurnOutcome::Paused(kind) => {
                    self.persist_state(&cursor, RunStatus::Waiting).await?;
                    let remaining = cursor.deadline.saturating_duration_since(Instant::now());
                    tokio::select! {
                        biased;
                        () = cancellation.cancelled() => {
                            self.publish_event(&cursor.run_id, "run_cancelled").await?;
                            return Ok(self.terminal(&mut cursor, RunOutcome::Cancelled, None));
                        }
                        () = tokio::time::sleep(remaining) => {
                            return Ok(self.terminal(&mut cursor, RunOutcome::TimedOut, Some("time budget elapsed while waiting".into())));
                        }
                        signal = signals.recv() => {
                            match signal {
                                None => return Err(LoopError::SignalChannelClosed(kind)),
                                Some(Signal::Cancel) => {
                                    self.publish_event(&cursor.run_id, "run_cancelled").await?;
                                    return Ok(self.terminal(&mut cursor, RunOutcome::Cancelled, None));
                                }
                                Some(Signal::ProvideClarification(payload)) => {
                                    if kind != AwaitKind::Clarification {
                                        cursor.notes.push("received clarification while awaiting tool results".into());
                                        continue;
                                    }
                                    cursor.messages.push(Message { role: "user".to_string(), content: payload });
                                    cursor.next_attachment = Attachment::UserTurn;
                                }
                                Some(Signal::ProvideToolResults(results)) => {
                                    if kind != AwaitKind::ExternalTools {
                                        cursor.notes.push("received tool results while awaiting clarification".into());
                                        continue;
                                    }
                                    self.absorb_tool_results(&mut cursor, &[], results)?;
                                    cursor.next_attachment = Attachment::ToolTurn;
                                }
                                Some(Signal::Pause | Signal::Resume) => {
                                    cursor.notes.push("pause/resume signal ignored while already paused".into());
                                }
                            }
                            self.persist_state(&cursor, RunStatus::Running).await?;
                        }
                    }
                }
            }
        }
    }

    /// Handle a user-initiated [`Signal::Pause`] received before the next
    /// turn begins: persist `Waiting`, publish a `run_paused` event, and
    /// block until `Resume`, `Cancel`, cancellation, or the run's deadline.
    /// Returns `Some(output)` if the run reached a terminal state while
    /// paused, or `None` once it is safe to resume advancing.
    async fn wait_while_paused(
        &mut self,
        cursor: &mut RunCursor,
        signals: &mut Receiver<Signal>,
        cancellation: &CancellationToken,
    ) -> Result<Option<RunOutput>, LoopError> {
        self.persist_state(cursor, RunStatus::Waiting).await?;
        self.publish_event(&cursor.run_id, "run_paused").await?;

        loop {
            let remaining = cursor.deadline.saturating_duration_since(Instant::now());
            tokio::select! {
                biased;
                () = cancellation.cancelled() => {
                    self.publish_event(&cursor.run_id, "run_cancelled").await?;
                    return Ok(Some(self.terminal(cursor, RunOutcome::Cancelled, None)));
                }
                () = tokio::time::sleep(remaining) => {
                    return Ok(Some(self.terminal(cursor, RunOutcome::TimedOut, Some("time budget elapsed while paused".into()))));
                }
                signal = signals.recv() => {
                    match signal {
                        None => return Err(LoopError::SignalChannelClosedWhilePaused),
                        Some(Signal::Resume) => {
                            self.persist_state(cursor, RunStatus::Running).await?;
                            return Ok(None);
                        }
                        Some(Signal::Cancel) => {
                            self.publish_event(&cursor.run_id, "run_cancelled").await?;
                            return Ok(Some(self.terminal(cursor, RunOutcome::Cancelled, None)));
                        }
                        Some(_) => {
                            cursor.notes.push("signal ignored while run is paused".into());
                        }
                    }
                }
            }
        }
    }

    pub(crate) async fn advance(
        &mut self,
        cursor: &mut RunCursor,
        cancellation: &CancellationToken,
    ) -> Result<TurnOutcome, LoopError> {
        if cancellation.is_cancelled() {
            self.publish_event(&cursor.run_id, "run_cancelled").await?;
            return Ok(TurnOutcome::Terminal(self.terminal(cursor, RunOutcome::Cancelled, None)));
        }
        if Instant::now() >= cursor.deadline {
            return Ok(TurnOutcome::Terminal(self.terminal(
                cursor,
                RunOutcome::TimedOut,
                Some("time budget elapsed".to_string()),
            )));
        }
        if cursor.counters.run_cap_exceeded(&self.config.budgets) || cursor.counters.failure_cap_exceeded(&self.config.budgets)
        {
            let reason = if cursor.counters.failure_cap_exceeded(&self.config.budgets) {
                "too many consecutive tool-call failures"
            } else {
                "run tool-call budget exceeded"
            };
            return Ok(TurnOutcome::Terminal(self.terminal(cursor, RunOutcome::BudgetExceeded, Some(reason.to_string()))));
        }

        if let Some(HookAction::Terminate { reason }) =
            self.fire_hooks(HookEvent::LoopIteration { turn: cursor.turn }).await?
        {
            return Ok(TurnOutcome::Terminal(self.terminal(cursor, RunOutcome::Failed, Some(reason))));
        }

        let available_tools = self.advertised_tools();
        let rendered = self.reminders.snapshot(&cursor.run_id, cursor.turn, cursor.next_attachment);

        let mut messages = cursor.messages.clone();
        messages.extend(cursor.ledger.build_messages());
        let mut full = vec![self.system_message.clone()];
        full.extend(messages);
        let full = ReminderEngine::inject_messages(full, &rendered);

        let input = PlanInput {
            agent: cursor.agent_id.clone(),
            messages: full,
            available_tools,
            tool_choice: if self.config.restrict_to_tool.is_some() { ToolChoice::Required } else { ToolChoice::Auto },
            restrict_to_tool: self.config.restrict_to_tool.clone(),
            budgets: self.config.budgets.clone(),
            reminders: rendered.clone(),
        };

        if let Some(HookAction::Terminate { reason }) = self.fire_hooks(HookEvent::PreLlmCall { input: &input }).await? {
            return Ok(TurnOutcome::Terminal(self.terminal(cursor, RunOutcome::Failed, Some(reason))));
        }

        let result: PlanResult = self.planner.complete(&input).await?;

        if let Some(HookAction::Terminate { reason }) = self.fire_hooks(HookEvent::PostLlmCall { result: &result }).await? {
            return Ok(TurnOutcome::Terminal(self.terminal(cursor, RunOutcome::Failed, Some(reason))));
        }

        for reminder in &rendered {
            self.reminders.mark_emitted(&cursor.run_id, &reminder.id, cursor.turn);
        }
        if let Some(usage) = &result.usage {
            cursor.usage.input_tokens += usage.input_tokens;
            cursor.usage.output_tokens += usage.output_tokens;
        }

        match result.decision {
            PlanDecision::FinalResponse { text } => {
                cursor.ledger.append_text(text.clone());
                Ok(TurnOutcome::Terminal(self.terminal_with_final(cursor, RunOutcome::Completed, None, Some(text))))
            }
            PlanDecision::Await { kind } => {
                self.publish_event(&cursor.run_id, "run_paused").await?;
                Ok(TurnOutcome::Paused(kind))
            }
            PlanDecision::ToolCalls { calls } => {
                self.execute_turn(cursor, calls, cancellation).await?;
                cursor.turn += 1;
                cursor.next_attachment = Attachment::ToolTurn;
                Ok(TurnOutcome::Continue)
            }
        }
    }

    async fn execute_turn(
        &mut self,
        cursor: &mut RunCursor,
        calls: Vec<ToolRequest>,
        cancellation: &CancellationToken,
    ) -> Result<(), LoopError> {
        let cap = self.config.budgets.per_turn_max_tool_calls;
        let (in_budget, surplus): (Vec<ToolRequest>, Vec<ToolRequest>) =
            if calls.len() > cap { (calls[..cap].to_vec(), calls[cap..].to_vec()) } else { (calls, Vec::new()) };

        let mut slots: Vec<Option<ToolResult>> = Vec::with_capacity(in_budget.len());
        let mut to_dispatch = Vec::new();
        for request in &in_budget {
            match self.fire_hooks(HookEvent::PreToolExecution { request }).await? {
                Some(HookAction::Terminate { reason }) => return Err(LoopError::HookTerminated(reason)),
                Some(HookAction::Skip { reason }) => {
                    slots.push(Some(skipped_result(request, &reason)));
                    continue;
                }
                _ => {}
            }
            slots.push(None);
            to_dispatch.push(request.clone());
        }

        let dispatched = self.dispatcher.dispatch_turn(&to_dispatch, cancellation).await;
        let mut dispatched_iter = dispatched.into_iter();
        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            results.push(match slot {
                Some(r) => r,
                None => dispatched_iter.next().expect("dispatch count matches non-skipped calls"),
            });
        }
        for result in &results {
            self.fire_hooks(HookEvent::PostToolExecution { result }).await?;
        }

        results.extend(surplus.iter().map(synthesize_surplus_error));
        let calls_for_ledger: Vec<ToolRequest> = in_budget.into_iter().chain(surplus).collect();
        self.absorb_tool_results(cursor, &calls_for_ledger, results)
    }

    /// Append a batch of tool calls and their results to the ledger and
    /// provider-shaped message history, updating budget counters.
    pub(crate) fn absorb_tool_results(
        &self,
        cursor: &mut RunCursor,
        calls: &[ToolRequest],
        results: Vec<ToolResult>,
    ) -> Result<(), LoopError> {
        for request in calls {
            let payload: Value = serde_json::from_slice(&request.payload).unwrap_or(Value::Null);
            cursor.ledger.declare_tool_use(request.tool_call_id.to_string(), request.name.to_string(), payload);
        }
        for result in &results {
            if result.is_error() {
                cursor.counters.record_failure();
            } else {
                cursor.counters.record_success();
            }
            let content = result
                .result
                .clone()
                .or_else(|| result.error.as_ref().map(|e| json!({"code": e.code, "message": e.message})))
                .unwrap_or(Value::Null);
            cursor.ledger.append_tool_result(result.tool_call_id.to_string(), content.to_string(), result.is_error());
            let encoded = serde_json::to_vec(&content).unwrap_or_default();
            cursor.tool_events.push(agent_core::ToolEvent::from_result(result, encoded));
        }
        cursor.ledger.validate()?;
        Ok(())
    }

    fn advertised_tools(&self) -> Vec<Identifier> {
        if let Some(tool) = &self.config.restrict_to_tool {
            return vec![tool.clone()];
        }
        self.tool_specs
            .specs()
            .into_iter()
            .filter(|spec| !self.config.denied_tools.contains(&spec.name))
            .filter(|spec| match &self.config.allowed_tags {
                Some(tags) => tags.iter().any(|t| spec.has_tag(t)),
                None => true,
            })
            .map(|spec| spec.name.clone())
            .collect()
    }

    async fn fire_hooks(&self, event: HookEvent<'_>) -> Result<Option<HookAction>, LoopError> {
        for hook in &self.hooks {
            if let Some(action) = hook.on_event(event.clone()).await {
                return Ok(Some(action));
            }
        }
        Ok(None)
    }

    fn terminal(&self, cursor: &mut RunCursor, outcome: RunOutcome, reason: Option<String>) -> RunOutput {
        self.terminal_with_final(cursor, outcome, reason, None)
    }

    fn terminal_with_final(
        &self,
        cursor: &mut RunCursor,
        outcome: RunOutcome,
        reason: Option<String>,
        final_text: Option<String>,
    ) -> RunOutput {
        info!(run_id = %cursor.run_id, turn = cursor.turn, ?outcome, "run reached terminal state");
        RunOutput {
            run_id: cursor.run_id.clone(),
            outcome,
            r#final: final_text.map(|text| Message { role: "assistant".to_string(), content: json!(text) }),
            tool_events: std::mem::take(&mut cursor.tool_events),
            usage: cursor.usage.clone(),
            notes: std::mem::take(&mut cursor.notes),
            reason,
        }
    }

    async fn persist_state(&self, cursor: &RunCursor, status: RunStatus) -> Result<(), LoopError> {
        let Some(store) = &self.run_store else { return Ok(()) };
        let now = SystemTime::now();
        let state = RunState {
            run_id: cursor.run_id.clone(),
            agent_id: cursor.agent_id.clone(),
            session_id: cursor.session_id.clone(),
            status,
            started_at: now,
            updated_at: now,
            usage: cursor.usage.clone(),
            turn_count: cursor.turn,
        };
        store.upsert(&state).await?;
        Ok(())
    }

    /// Append a lifecycle event to the run's memory-store history, if one
    /// is configured (spec.md §4.10's `Await`-pause and §4.10
    /// cancellation event-publishing requirements).
    async fn publish_event(&self, run_id: &RunId, event_type: &str) -> Result<(), LoopError> {
        let Some(store) = &self.memory_store else { return Ok(()) };
        store.append_events(run_id, vec![json!({"type": event_type})]).await?;
        Ok(())
    }
}

fn skipped_result(request: &ToolRequest, reason: &str) -> ToolResult {
    ToolResult {
        name: request.name.clone(),
        tool_call_id: request.tool_call_id.clone(),
        result: None,
        result_bytes: 0,
        result_omitted: false,
        result_omitted_reason: None,
        server_data: None,
        sidecar: None,
        bounds: None,
        error: Some(ToolErrorInfo { code: "skipped_by_hook".to_string(), message: reason.to_string() }),
        retry_hint: None,
        telemetry: None,
        children_count: 0,
        run_link: None,
    }
}
