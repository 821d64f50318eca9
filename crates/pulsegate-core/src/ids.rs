use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an agent. Agents are created at configuration load
/// and never destroyed during steady state, so this is a plain newtype
/// around a configured string rather than a generated UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Stable identifier for a pulse routine. Generated as a UUIDv7 so routine
/// ids sort chronologically in logs and storage, matching the teacher's
/// `UserId` convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoutineId(pub String);

impl RoutineId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoutineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoutineId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoutineId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier for an active session — either a channel conversation or an
/// active pulse. Pulse session ids follow
/// `pulse_{agentId}[_{routineId}]_{scheduledAt}` per spec §4.3 step 2.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn for_pulse(agent_id: &AgentId, routine_id: Option<&RoutineId>, scheduled_at: i64) -> Self {
        match routine_id {
            Some(r) => Self(format!("pulse_{}_{}_{}", agent_id, r, scheduled_at)),
            None => Self(format!("pulse_{}_{}", agent_id, scheduled_at)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_session_id_with_routine() {
        let id = SessionId::for_pulse(&AgentId::new("alice"), Some(&RoutineId::from("r1")), 1000);
        assert_eq!(id.as_str(), "pulse_alice_r1_1000");
    }

    #[test]
    fn pulse_session_id_legacy() {
        let id = SessionId::for_pulse(&AgentId::new("alice"), None, 1000);
        assert_eq!(id.as_str(), "pulse_alice_1000");
    }
}
