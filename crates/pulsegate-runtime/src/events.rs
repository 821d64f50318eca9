use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use pulsegate_core::RoutineId;
use pulsegate_eventbus::EventBus;
use pulsegate_scheduler::{PulseEventPublisher, PulseObserver, PulseResult};

/// Publishes pulse lifecycle events onto the durable per-session event
/// bus (spec §4.5's `PIPELINE_*` named events), keyed by the pulse's
/// session id exactly as the executor derives it.
pub struct EventBusPulsePublisher {
    bus: Arc<EventBus>,
}

impl EventBusPulsePublisher {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl PulseEventPublisher for EventBusPulsePublisher {
    async fn publish(&self, session_key: &str, event_type: &str, payload: serde_json::Value) {
        self.bus.publish(session_key, event_type, None, payload);
    }
}

/// Best-effort lifecycle notifier (spec §4.3 step 6, §9 "cross-module
/// lifecycles"): logs completion and surfaces consecutive-skip streaks at
/// warn level, swallowing its own errors per spec §7's propagation policy
/// for informational callbacks.
pub struct LoggingPulseObserver;

#[async_trait]
impl PulseObserver for LoggingPulseObserver {
    async fn on_pulse_complete(&self, result: &PulseResult) {
        if result.skipped {
            info!(agent_id = %result.agent_id, routine_id = ?result.routine_id, "pulse skipped");
        } else if result.errors.is_empty() {
            info!(agent_id = %result.agent_id, routine_id = ?result.routine_id, actions = result.actions.len(), "pulse completed");
        } else {
            warn!(agent_id = %result.agent_id, routine_id = ?result.routine_id, errors = ?result.errors, "pulse completed with errors");
        }
    }

    async fn on_routine_pulse_complete(&self, routine_id: &RoutineId) {
        info!(%routine_id, "routine pulse complete");
    }
}
