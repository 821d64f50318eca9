use async_trait::async_trait;
use dashmap::DashMap;

use pulsegate_core::capability::{AgentState, RegistryUnavailable, SessionRegistry};
use pulsegate_core::AgentId;

/// Standalone default session registry (SPEC_FULL.md §0: every external
/// collaborator trait ships one concrete in-process implementation so the
/// workspace is runnable on its own). Tracks active pulse sessions per
/// agent against a single process-wide cap; a real deployment would swap
/// this for a registry backed by the actual agent runner process.
pub struct InMemorySessionRegistry {
    active: DashMap<AgentId, u32>,
    max_concurrent_per_agent: u32,
}

impl InMemorySessionRegistry {
    pub fn new(max_concurrent_per_agent: u32) -> Self {
        Self { active: DashMap::new(), max_concurrent_per_agent }
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn start_pulse_session(&self, agent_id: &AgentId, _session_id: &str) -> Result<bool, RegistryUnavailable> {
        let mut count = self.active.entry(agent_id.clone()).or_insert(0);
        if *count >= self.max_concurrent_per_agent {
            return Ok(false);
        }
        *count += 1;
        Ok(true)
    }

    async fn end_pulse_session(&self, agent_id: &AgentId, _session_id: &str) {
        if let Some(mut count) = self.active.get_mut(agent_id) {
            *count = count.saturating_sub(1);
        }
    }

    async fn get_agent_state(&self, agent_id: &AgentId) -> Option<AgentState> {
        match self.active.get(agent_id) {
            Some(count) if *count > 0 => Some(AgentState::Working),
            _ => Some(AgentState::Idle),
        }
    }
}
