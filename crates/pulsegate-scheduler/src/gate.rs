//! Two-level admission control (spec §4.2): a routine gate (at most one
//! active session per routine) stacked on an agent gate (at most
//! `maxConcurrentPulseSessions` per agent), plus consecutive-skip
//! accounting.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use pulsegate_core::capability::{AgentState, SessionRegistry};
use pulsegate_core::AgentId;

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Admit,
    /// Reject with the consecutive-skip count *after* this skip.
    Skip { consecutive_skips: u32 },
}

/// Stacked routine + agent admission control.
///
/// `maxPerRoutine` is always 1 in this spec revision (spec §4.2 notes a
/// later extension for per-routine caps); the routine key alone is enough
/// to track in-flight sessions since only one can ever be active.
pub struct ConcurrencyGate {
    registry: Arc<dyn SessionRegistry>,
    /// Consecutive-skip counters keyed by `routine_id` or `agent_id`.
    skip_counters: DashMap<String, u32>,
    max_consecutive_skips_default: u32,
}

impl ConcurrencyGate {
    pub fn new(registry: Arc<dyn SessionRegistry>, max_consecutive_skips_default: u32) -> Self {
        Self {
            registry,
            skip_counters: DashMap::new(),
            max_consecutive_skips_default,
        }
    }

    /// Attempt to admit a pulse for `agent_id`/`session_id`. `gate_key` is
    /// the routine id (or agent id for legacy schedules) used for
    /// consecutive-skip accounting; `max_consecutive_skips` is the
    /// routine's configured threshold (falls back to the process default).
    pub async fn admit(
        &self,
        agent_id: &AgentId,
        session_id: &str,
        gate_key: &str,
        max_consecutive_skips: Option<u32>,
    ) -> GateDecision {
        let admitted = match self.registry.start_pulse_session(agent_id, session_id).await {
            Ok(admitted) => admitted,
            Err(_) => {
                // Degraded mode: skip unless the agent is externally
                // reported idle (spec §4.2 "Fallback").
                warn!(%agent_id, "session registry unavailable, degrading to idle-state fallback");
                matches!(
                    self.registry.get_agent_state(agent_id).await,
                    Some(AgentState::Idle) | None
                )
            }
        };

        if admitted {
            self.reset_skip_streak(gate_key);
            return GateDecision::Admit;
        }

        let threshold = max_consecutive_skips.unwrap_or(self.max_consecutive_skips_default);
        let count = self.increment_skip_streak(gate_key);
        if count == threshold {
            warn!(gate_key, count, "consecutive skip threshold reached");
        }
        GateDecision::Skip {
            consecutive_skips: count,
        }
    }

    pub async fn release(&self, agent_id: &AgentId, session_id: &str) {
        self.registry.end_pulse_session(agent_id, session_id).await;
    }

    fn increment_skip_streak(&self, key: &str) -> u32 {
        let mut entry = self.skip_counters.entry(key.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    fn reset_skip_streak(&self, key: &str) {
        self.skip_counters.insert(key.to_string(), 0);
    }

    pub fn consecutive_skips(&self, key: &str) -> u32 {
        self.skip_counters.get(key).map(|v| *v).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pulsegate_core::capability::RegistryUnavailable;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CappedRegistry {
        cap: u32,
        active: AtomicU32,
    }

    #[async_trait]
    impl SessionRegistry for CappedRegistry {
        async fn start_pulse_session(&self, _a: &AgentId, _s: &str) -> Result<bool, RegistryUnavailable> {
            let cur = self.active.load(Ordering::SeqCst);
            if cur >= self.cap {
                return Ok(false);
            }
            self.active.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
        async fn end_pulse_session(&self, _a: &AgentId, _s: &str) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
        async fn get_agent_state(&self, _a: &AgentId) -> Option<AgentState> {
            None
        }
    }

    struct UnavailableRegistry;

    #[async_trait]
    impl SessionRegistry for UnavailableRegistry {
        async fn start_pulse_session(&self, _a: &AgentId, _s: &str) -> Result<bool, RegistryUnavailable> {
            Err(RegistryUnavailable)
        }
        async fn end_pulse_session(&self, _a: &AgentId, _s: &str) {}
        async fn get_agent_state(&self, _a: &AgentId) -> Option<AgentState> {
            Some(AgentState::Working)
        }
    }

    #[tokio::test]
    async fn second_concurrent_session_is_skipped() {
        let gate = ConcurrencyGate::new(Arc::new(CappedRegistry { cap: 1, active: AtomicU32::new(0) }), 5);
        let agent = AgentId::new("a");
        let first = gate.admit(&agent, "s1", "r1", None).await;
        assert_eq!(first, GateDecision::Admit);
        let second = gate.admit(&agent, "s2", "r2", None).await;
        assert_eq!(second, GateDecision::Skip { consecutive_skips: 1 });
    }

    #[tokio::test]
    async fn skip_streak_resets_on_admit() {
        let gate = ConcurrencyGate::new(Arc::new(CappedRegistry { cap: 0, active: AtomicU32::new(0) }), 5);
        let agent = AgentId::new("a");
        gate.admit(&agent, "s1", "r1", None).await;
        gate.admit(&agent, "s2", "r1", None).await;
        assert_eq!(gate.consecutive_skips("r1"), 2);
    }

    #[tokio::test]
    async fn degraded_mode_admits_when_idle_unknown() {
        let gate = ConcurrencyGate::new(Arc::new(UnavailableRegistry), 5);
        // UnavailableRegistry reports Working, so admission should be denied.
        let decision = gate.admit(&AgentId::new("a"), "s1", "r1", None).await;
        assert_eq!(decision, GateDecision::Skip { consecutive_skips: 1 });
    }
}
