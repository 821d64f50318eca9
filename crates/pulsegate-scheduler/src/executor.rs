//! The Pulse Executor (spec §4.3): consumes due pulses, gates them,
//! gathers context, invokes the session runner, and re-arms a single
//! timer for the next fire — the scheduler itself never owns a timer
//! (spec §4.1), this is the "single cooperative context" described in
//! spec §5.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashSet;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use pulsegate_core::capability::{SessionContext, SessionRegistry, SessionRunner};
use pulsegate_core::{AgentId, RoutineId, SessionId};

use crate::error::{Result, SchedulerError};
use crate::gate::{ConcurrencyGate, GateDecision};
use crate::scheduler::Scheduler;
use crate::types::{PulseResult, PulseSource, ScheduledPulse};

/// Best-effort context-gathering collaborators (spec §4.3 step 3). Each
/// method is run independently via `tokio::join!`; a failing future turns
/// into an `errors[]` entry rather than aborting the pulse, matching the
/// teacher's "never let one optional enrichment step kill the turn"
/// approach (`skynet-agent::pipeline::process` degrading gracefully on
/// memory/tool failures).
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn unread_count(&self, agent_id: &AgentId) -> std::result::Result<u32, String>;
    async fn unread_messages(&self, agent_id: &AgentId) -> std::result::Result<Vec<String>, String>;
    async fn assigned_tasks(&self, agent_id: &AgentId) -> std::result::Result<Vec<String>, String>;
    async fn project_overrides(
        &self,
        agent_id: &AgentId,
        routine_id: Option<&RoutineId>,
    ) -> std::result::Result<Option<serde_json::Value>, String>;
}

/// Optional external memory consolidation step (spec §4.3 step 4).
#[async_trait]
pub trait MemoryConsolidator: Send + Sync {
    async fn consolidate(&self, agent_id: &AgentId, context: &SessionContext);
}

/// Lifecycle notification sink (spec §4.3 step 6, §9 "cross-module
/// lifecycles"). Both methods are informational/best-effort — callers
/// must swallow their own errors (spec §7 propagation policy).
#[async_trait]
pub trait PulseObserver: Send + Sync {
    async fn on_pulse_complete(&self, result: &PulseResult);
    async fn on_routine_pulse_complete(&self, routine_id: &RoutineId);
}

/// Narrow publishing capability so the executor can surface
/// `PIPELINE_{QUEUED,OUTPUT,STEP_COMPLETE,…}` events (spec §4.5) without
/// taking a hard dependency on `pulsegate-eventbus`; the runtime wires a
/// concrete event-bus-backed implementation at composition time.
#[async_trait]
pub trait PulseEventPublisher: Send + Sync {
    async fn publish(&self, session_key: &str, event_type: &str, payload: serde_json::Value);
}

/// Drives firing: arms exactly one timer for `getNextPulseTime()`, fires,
/// gates, executes, and re-arms.
pub struct PulseExecutor {
    scheduler: Arc<Scheduler>,
    gate: Arc<ConcurrencyGate>,
    registry: Arc<dyn SessionRegistry>,
    context: Arc<dyn ContextProvider>,
    memory: Option<Arc<dyn MemoryConsolidator>>,
    runner: Arc<dyn SessionRunner>,
    observer: Option<Arc<dyn PulseObserver>>,
    events: Option<Arc<dyn PulseEventPublisher>>,
    /// Gate keys (routine id, or agent id for legacy schedules) with a
    /// pulse currently in flight — backs the "already in progress"
    /// manual-trigger rejection (spec §4.3 "Cancellation").
    in_flight: DashSet<String>,
}

impl PulseExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scheduler: Arc<Scheduler>,
        gate: Arc<ConcurrencyGate>,
        registry: Arc<dyn SessionRegistry>,
        context: Arc<dyn ContextProvider>,
        memory: Option<Arc<dyn MemoryConsolidator>>,
        runner: Arc<dyn SessionRunner>,
        observer: Option<Arc<dyn PulseObserver>>,
        events: Option<Arc<dyn PulseEventPublisher>>,
    ) -> Self {
        Self {
            scheduler,
            gate,
            registry,
            context,
            memory,
            runner,
            observer,
            events,
            in_flight: DashSet::new(),
        }
    }

    fn gate_key(pulse: &ScheduledPulse) -> String {
        pulse
            .routine_id
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| pulse.agent_id.to_string())
    }

    /// Main loop: re-arms a single `sleep_until` for the next fire time
    /// until `shutdown` broadcasts `true`.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("pulse executor started");
        loop {
            let next = self.scheduler.get_next_pulse_time(Utc::now());
            let sleep = match next {
                Some(ref pulse) => {
                    let now = Utc::now();
                    let delta = (pulse.scheduled_at - now)
                        .to_std()
                        .unwrap_or(StdDuration::from_secs(0));
                    tokio::time::sleep(delta)
                }
                // Nothing scheduled: poll again in a minute rather than
                // spinning — a routine could be added in the meantime.
                None => tokio::time::sleep(StdDuration::from_secs(60)),
            };

            tokio::select! {
                _ = sleep => {
                    if let Some(pulse) = next {
                        let this = Arc::clone(&self);
                        tokio::spawn(async move {
                            this.fire(pulse).await;
                        });
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("pulse executor shutting down");
                        break;
                    }
                }
            }
        }
    }

    #[instrument(skip(self, pulse), fields(agent_id = %pulse.agent_id, routine_id = ?pulse.routine_id))]
    async fn fire(&self, pulse: ScheduledPulse) {
        let gate_key = Self::gate_key(&pulse);
        self.in_flight.insert(gate_key.clone());
        let result = self.execute_pulse(pulse).await;
        self.in_flight.remove(&gate_key);

        if let Some(observer) = &self.observer {
            observer.on_pulse_complete(&result).await;
            if !result.skipped {
                if let Some(routine_id) = &result.routine_id {
                    observer.on_routine_pulse_complete(routine_id).await;
                }
            }
        }
    }

    /// Execute a single pulse end-to-end (spec §4.3 steps 1–8).
    async fn execute_pulse(&self, pulse: ScheduledPulse) -> PulseResult {
        let gate_key = Self::gate_key(&pulse);
        let max_skips = pulse
            .routine_id
            .as_ref()
            .and_then(|r| self.scheduler.get_routine(r))
            .map(|r| r.max_consecutive_skips);

        let session_id = SessionId::for_pulse(
            &pulse.agent_id,
            pulse.routine_id.as_ref(),
            pulse.scheduled_at.timestamp_millis(),
        );

        match self
            .gate
            .admit(&pulse.agent_id, session_id.as_str(), &gate_key, max_skips)
            .await
        {
            GateDecision::Skip { .. } => {
                return PulseResult::skip(
                    pulse.agent_id.clone(),
                    pulse.routine_id.clone(),
                    pulse.scheduled_at,
                    pulse.source,
                );
            }
            GateDecision::Admit => {}
        }

        self.publish(&session_id, "PIPELINE_QUEUED", serde_json::json!({})).await;
        self.publish(&session_id, "PIPELINE_STARTED", serde_json::json!({})).await;

        let mut errors = Vec::new();

        let (unread_count, tasks, overrides) = tokio::join!(
            self.context.unread_count(&pulse.agent_id),
            self.context.assigned_tasks(&pulse.agent_id),
            self.context.project_overrides(&pulse.agent_id, pulse.routine_id.as_ref()),
        );

        let unread_count = unread_count.unwrap_or_else(|e| {
            errors.push(format!("unread_count: {e}"));
            0
        });
        // Only fetch the unread message list when there's something to
        // fetch (spec §4.3 step 3) — no call is issued otherwise.
        let unread_messages = if unread_count > 0 {
            self.context
                .unread_messages(&pulse.agent_id)
                .await
                .unwrap_or_else(|e| {
                    errors.push(format!("unread_messages: {e}"));
                    Vec::new()
                })
        } else {
            Vec::new()
        };
        let assigned_tasks = tasks.unwrap_or_else(|e| {
            errors.push(format!("assigned_tasks: {e}"));
            Vec::new()
        });
        let project_overrides = overrides.unwrap_or_else(|e| {
            errors.push(format!("project_overrides: {e}"));
            None
        });

        let routine = pulse.routine_id.as_ref().and_then(|r| self.scheduler.get_routine(r));
        let context = SessionContext {
            routine_id: pulse.routine_id.as_ref().map(|r| r.to_string()),
            routine_name: pulse.routine_name.clone(),
            instructions: routine.as_ref().and_then(|r| r.instructions.clone()),
            unread_count,
            unread_messages,
            assigned_tasks,
            project_overrides,
        };

        if let Some(memory) = &self.memory {
            memory.consolidate(&pulse.agent_id, &context).await;
        }

        let outcome = self.runner.run_session(&pulse.agent_id, context).await;
        for action in &outcome.actions {
            self.publish(&session_id, "PIPELINE_OUTPUT", serde_json::json!({ "action": action }))
                .await;
        }
        if outcome.success {
            self.publish(&session_id, "PIPELINE_STEP_COMPLETE", serde_json::json!({})).await;
            self.publish(&session_id, "PIPELINE_RUN_COMPLETE", serde_json::json!({})).await;
        } else {
            self.publish(&session_id, "PIPELINE_STEP_FAILED", serde_json::json!({})).await;
            self.publish(&session_id, "PIPELINE_RUN_FAILED", serde_json::json!({})).await;
        }

        self.gate.release(&pulse.agent_id, session_id.as_str()).await;

        if pulse.source == PulseSource::OneOff {
            if let Err(e) = self.scheduler.remove_one_off_pulse(&pulse.agent_id, pulse.scheduled_at) {
                warn!(error = %e, "failed to prune fired one-off timestamp");
            }
        }
        self.record_run_stats(&pulse);

        PulseResult {
            agent_id: pulse.agent_id,
            routine_id: pulse.routine_id,
            skipped: false,
            unread_count,
            errors,
            actions: outcome.actions,
            output: outcome.output,
            scheduled_at: pulse.scheduled_at,
            source: pulse.source,
        }
    }

    fn record_run_stats(&self, pulse: &ScheduledPulse) {
        if let Some(routine_id) = &pulse.routine_id {
            if let Some(mut routine) = self.scheduler.get_routine(routine_id) {
                routine.stats.last_run_at = Some(pulse.scheduled_at);
                routine.stats.total_runs += 1;
                if let Err(e) = self.scheduler.set_routine_schedule(routine) {
                    error!(error = %e, "failed to persist routine run stats");
                }
            }
        }
    }

    async fn publish(&self, session_id: &SessionId, event_type: &str, payload: serde_json::Value) {
        if let Some(events) = &self.events {
            events.publish(session_id.as_str(), event_type, payload).await;
        }
    }

    /// Manual trigger (spec §4.3 "Cancellation"): rejects if the target is
    /// already queued, otherwise races execution against `timeout_ms`. On
    /// timeout the caller is told "failed" but the in-flight session is
    /// not forcibly killed — the execution keeps running on its own spawned
    /// task and clears `in_flight` itself whenever it eventually finishes.
    pub async fn trigger_manual(
        self: &Arc<Self>,
        agent_id: AgentId,
        routine_id: Option<RoutineId>,
        timeout_ms: u64,
    ) -> Result<PulseResult> {
        let gate_key = routine_id.as_ref().map(|r| r.to_string()).unwrap_or_else(|| agent_id.to_string());
        if self.in_flight.contains(&gate_key) {
            return Err(SchedulerError::AlreadyInProgress);
        }
        self.in_flight.insert(gate_key.clone());

        let pulse = ScheduledPulse {
            agent_id,
            routine_id,
            routine_name: None,
            scheduled_at: Utc::now(),
            source: PulseSource::Manual,
        };

        let this = Arc::clone(self);
        let task_key = gate_key.clone();
        let handle = tokio::spawn(async move {
            let result = this.execute_pulse(pulse).await;
            this.in_flight.remove(&task_key);
            result
        });

        tokio::select! {
            joined = handle => {
                joined.map_err(|e| SchedulerError::InvalidRoutine(format!("manual trigger task panicked: {e}")))
            }
            _ = tokio::time::sleep(StdDuration::from_millis(timeout_ms)) => {
                // Intentionally leave `gate_key` in `in_flight` — the
                // spawned task above is still running and will clear it
                // itself when `execute_pulse` finally completes.
                Err(SchedulerError::Timeout { ms: timeout_ms })
            }
        }
    }

    pub fn in_flight_keys(&self) -> HashSet<String> {
        self.in_flight.iter().map(|e| e.clone()).collect()
    }
}
