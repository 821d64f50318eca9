//! The four wake guardrails, evaluated in order (spec §4.4).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use pulsegate_core::capability::{AgentState, SessionRegistry};
use pulsegate_core::AgentId;

use crate::counter::CounterStore;

/// Why a wake was rejected or deferred (spec §4.4, §8 scenario 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeRejection {
    Cooldown,
    DailyCap,
    PairCap,
    /// Not a rejection — the agent is busy; the inbound message stays in
    /// the inbox and no counter is consumed (spec §4.4 step 4).
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeDecision {
    Accepted,
    Rejected(WakeRejection),
}

pub struct WakeGateConfig {
    pub cooldown_seconds: u64,
    pub max_wakes_per_day: i64,
    pub max_wakes_per_pair_per_day: i64,
    pub counter_ttl_hours: u64,
}

/// Stacked guardrails backed by a shared [`CounterStore`] (spec §4.4).
pub struct WakeGate {
    store: Arc<dyn CounterStore>,
    registry: Arc<dyn SessionRegistry>,
    config: WakeGateConfig,
    /// `lastWake[agentId]` (spec §3 `Wake counters`, §4.4 step "record").
    last_wake: DashMap<AgentId, std::time::Instant>,
}

impl WakeGate {
    pub fn new(store: Arc<dyn CounterStore>, registry: Arc<dyn SessionRegistry>, config: WakeGateConfig) -> Self {
        Self {
            store,
            registry,
            config,
            last_wake: DashMap::new(),
        }
    }

    /// Evaluate the four guardrails for a wake from `source` targeting
    /// `target`, in spec order: cooldown, daily cap, pair cap, busy check.
    pub async fn evaluate(&self, target: &AgentId, source: &str) -> WakeDecision {
        if let Some(last) = self.last_wake.get(target) {
            if last.elapsed() < StdDuration::from_secs(self.config.cooldown_seconds) {
                debug!(%target, "wake rejected: cooldown");
                return WakeDecision::Rejected(WakeRejection::Cooldown);
            }
        }

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let daily_key = format!("wakes:{target}:{date}");
        let pair_key = format!("wakes_from:{target}:{source}:{date}");

        let daily_value = self.store.incr(&daily_key).await;
        if daily_value == 1 {
            self.store.expire(&daily_key, self.config.counter_ttl_hours * 3600).await;
        }
        if daily_value > self.config.max_wakes_per_day {
            self.store.decr(&daily_key).await;
            debug!(%target, "wake rejected: daily cap");
            return WakeDecision::Rejected(WakeRejection::DailyCap);
        }

        let pair_value = self.store.incr(&pair_key).await;
        if pair_value == 1 {
            self.store.expire(&pair_key, self.config.counter_ttl_hours * 3600).await;
        }
        if pair_value > self.config.max_wakes_per_pair_per_day {
            // Roll back *both* counters (spec §4.4 step 3, invariant
            // spec §8 #3: "both the daily and pair counters equal their
            // pre-increment values").
            self.store.decr(&pair_key).await;
            self.store.decr(&daily_key).await;
            debug!(%target, %source, "wake rejected: pair cap");
            return WakeDecision::Rejected(WakeRejection::PairCap);
        }

        if !matches!(self.registry.get_agent_state(target).await, Some(AgentState::Idle) | None) {
            // Busy: defer, rolling back both counters incremented above so
            // the deferred wake consumes none of the agent's budget (spec
            // §4.4 step 4: "no counter consumed").
            self.store.decr(&pair_key).await;
            self.store.decr(&daily_key).await;
            debug!(%target, "wake deferred: agent busy");
            return WakeDecision::Rejected(WakeRejection::Busy);
        }

        self.last_wake.insert(target.clone(), std::time::Instant::now());
        WakeDecision::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::InMemoryCounterStore;
    use async_trait::async_trait;
    use pulsegate_core::capability::RegistryUnavailable;

    struct IdleRegistry;
    #[async_trait]
    impl SessionRegistry for IdleRegistry {
        async fn start_pulse_session(&self, _a: &AgentId, _s: &str) -> std::result::Result<bool, RegistryUnavailable> {
            Ok(true)
        }
        async fn end_pulse_session(&self, _a: &AgentId, _s: &str) {}
        async fn get_agent_state(&self, _a: &AgentId) -> Option<AgentState> {
            Some(AgentState::Idle)
        }
    }

    fn gate(max_per_day: i64, max_per_pair: i64) -> WakeGate {
        WakeGate::new(
            Arc::new(InMemoryCounterStore::new()),
            Arc::new(IdleRegistry),
            WakeGateConfig {
                cooldown_seconds: 0,
                max_wakes_per_day: max_per_day,
                max_wakes_per_pair_per_day: max_per_pair,
                counter_ttl_hours: 48,
            },
        )
    }

    #[tokio::test]
    async fn pair_cap_rejects_after_limit_without_mutating_daily_cap() {
        let gate = gate(100, 2);
        let target = AgentId::new("a");
        assert_eq!(gate.evaluate(&target, "b").await, WakeDecision::Accepted);
        // reset cooldown between waves for the test
        gate.last_wake.remove(&target);
        assert_eq!(gate.evaluate(&target, "b").await, WakeDecision::Accepted);
        gate.last_wake.remove(&target);
        let decision = gate.evaluate(&target, "b").await;
        assert_eq!(decision, WakeDecision::Rejected(WakeRejection::PairCap));

        let date = Utc::now().format("%Y-%m-%d").to_string();
        assert_eq!(gate.store.get(&format!("wakes:{target}:{date}")).await, Some(2));
    }

    #[tokio::test]
    async fn different_source_is_independent_of_pair_cap() {
        let gate = gate(100, 1);
        let target = AgentId::new("a");
        assert_eq!(gate.evaluate(&target, "b").await, WakeDecision::Accepted);
        gate.last_wake.remove(&target);
        assert_eq!(gate.evaluate(&target, "b").await, WakeDecision::Rejected(WakeRejection::PairCap));
        assert_eq!(gate.evaluate(&target, "c").await, WakeDecision::Accepted);
    }

    #[tokio::test]
    async fn cooldown_rejects_rapid_repeats() {
        let mut config = WakeGateConfig {
            cooldown_seconds: 60,
            max_wakes_per_day: 10,
            max_wakes_per_pair_per_day: 10,
            counter_ttl_hours: 48,
        };
        config.cooldown_seconds = 60;
        let g = WakeGate::new(Arc::new(InMemoryCounterStore::new()), Arc::new(IdleRegistry), config);
        let target = AgentId::new("a");
        assert_eq!(g.evaluate(&target, "b").await, WakeDecision::Accepted);
        assert_eq!(g.evaluate(&target, "b").await, WakeDecision::Rejected(WakeRejection::Cooldown));
    }
}
