//! Wake subsystem wiring (spec §4.4): subscribes to `agent:*:wake`,
//! applies the four guardrails, and forwards accepted wakes to the Pulse
//! Executor as a manual trigger.

use std::sync::Arc;

use tokio_stream::StreamExt;
use tracing::{info, warn};

use pulsegate_core::AgentId;
use pulsegate_eventbus::PubSub;
use pulsegate_protocol::frames::WakePayload;
use pulsegate_protocol::methods::WAKE_PATTERN;
use pulsegate_scheduler::PulseExecutor;

use crate::gate::{WakeDecision, WakeGate};

/// Default wall-clock budget for the manual trigger a wake enqueues
/// (spec §4.3's manual-trigger race, applied generically here since the
/// wake payload carries no per-wake override).
const WAKE_MANUAL_TIMEOUT_MS: u64 = 120_000;

pub struct WakeSubsystem {
    gate: Arc<WakeGate>,
    executor: Arc<PulseExecutor>,
}

impl WakeSubsystem {
    pub fn new(gate: Arc<WakeGate>, executor: Arc<PulseExecutor>) -> Self {
        Self { gate, executor }
    }

    /// Drive the subscription loop until the pub/sub stream ends (i.e.
    /// forever, for a live broadcast-backed implementation).
    pub async fn run(self: Arc<Self>, pubsub: Arc<dyn PubSub>) {
        let mut stream = pubsub.subscribe(WAKE_PATTERN);
        info!(pattern = WAKE_PATTERN, "wake subsystem subscribed");
        while let Some(Ok(message)) = stream.next().await {
            let Some(target) = extract_agent_id(&message.subject) else {
                warn!(subject = %message.subject, "wake subsystem: subject did not match agent:*:wake");
                continue;
            };
            let payload: WakePayload = match serde_json::from_value(message.payload) {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "wake subsystem: malformed payload");
                    continue;
                }
            };
            self.clone().handle_wake(target, payload).await;
        }
    }

    async fn handle_wake(self: Arc<Self>, target: AgentId, payload: WakePayload) {
        match self.gate.evaluate(&target, &payload.from).await {
            WakeDecision::Accepted => {
                info!(%target, from = %payload.from, "wake accepted, enqueuing manual pulse");
                let executor = Arc::clone(&self.executor);
                tokio::spawn(async move {
                    if let Err(e) = executor.trigger_manual(target, None, WAKE_MANUAL_TIMEOUT_MS).await {
                        warn!(error = %e, "wake-triggered manual pulse failed");
                    }
                });
            }
            WakeDecision::Rejected(reason) => {
                info!(%target, from = %payload.from, ?reason, "wake rejected");
            }
        }
    }
}

fn extract_agent_id(subject: &str) -> Option<AgentId> {
    let mut parts = subject.split(':');
    if parts.next()? != "agent" {
        return None;
    }
    let agent = parts.next()?;
    if parts.next()? != "wake" {
        return None;
    }
    Some(AgentId::new(agent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_agent_id_from_subject() {
        assert_eq!(extract_agent_id("agent:alice:wake"), Some(AgentId::new("alice")));
        assert_eq!(extract_agent_id("channel:credentials-changed"), None);
    }
}
