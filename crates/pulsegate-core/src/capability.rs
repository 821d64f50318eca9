//! Capability traits — narrow, enumerated contracts for the external
//! collaborators named in spec §6, expressed as explicit trait objects
//! rather than optional function fields (spec §9 "callbacks as capability
//! sets").
//!
//! Each trait here is deliberately small: an implementation that cannot
//! support a given capability simply isn't constructed, and the component
//! that depends on it degrades predictably (spec §4.2's "fallback: if the
//! agent registry is unavailable, the gate degrades to …").

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ids::AgentId;

/// Runtime state of an agent as externally reported by the session
/// registry (spec §6 `getAgentState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Idle,
    Working,
    Thinking,
    ToolCalling,
}

impl AgentState {
    pub fn is_idle(self) -> bool {
        matches!(self, AgentState::Idle)
    }
}

/// Marker error: the session registry could not be reached at all (as
/// opposed to reaching it and being told "at capacity"). The Concurrency
/// Gate's degraded-mode fallback (spec §4.2) only triggers on this variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryUnavailable;

/// The active-session registry (spec §4.2, §6).
///
/// Owned entirely by the Pulse Executor's caller in a real deployment; the
/// core only ever calls through this trait, never holds the session map
/// itself (spec §3 "Ownership").
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Attempt to register a new pulse session for `agent_id`. Returns
    /// `Ok(false)` when the agent is already at its concurrency cap, and
    /// `Err(RegistryUnavailable)` when the registry itself cannot be
    /// reached (distinct from a deliberate "at cap" answer).
    async fn start_pulse_session(
        &self,
        agent_id: &AgentId,
        session_id: &str,
    ) -> Result<bool, RegistryUnavailable>;

    /// Unregister a previously started pulse session. Idempotent.
    async fn end_pulse_session(&self, agent_id: &AgentId, session_id: &str);

    /// Best-effort externally reported state; used by the Concurrency
    /// Gate's degraded-mode fallback.
    async fn get_agent_state(&self, agent_id: &AgentId) -> Option<AgentState>;
}

/// Context handed to a session runner invocation (spec §6 `runSession`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    pub routine_id: Option<String>,
    pub routine_name: Option<String>,
    pub instructions: Option<String>,
    pub unread_count: u32,
    pub unread_messages: Vec<String>,
    pub assigned_tasks: Vec<String>,
    /// Opaque per-project routine override blob forwarded as-is.
    pub project_overrides: Option<serde_json::Value>,
}

/// Outcome of a session runner invocation (spec §6 `SessionResult`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    pub success: bool,
    pub actions: Vec<String>,
    pub output: Option<String>,
}

/// External session runner (spec §6). Streaming output does not flow back
/// through this call — it reaches the Event Bus separately, keyed by
/// session id.
#[async_trait]
pub trait SessionRunner: Send + Sync {
    async fn run_session(&self, agent_id: &AgentId, context: SessionContext) -> SessionResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_state_idle_predicate() {
        assert!(AgentState::Idle.is_idle());
        assert!(!AgentState::Working.is_idle());
    }
}
