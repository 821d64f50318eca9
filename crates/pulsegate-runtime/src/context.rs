use async_trait::async_trait;

use pulsegate_core::{AgentId, RoutineId};
use pulsegate_scheduler::ContextProvider;

/// Standalone default context provider: reports no unread/assigned work.
/// A real deployment wires this to the messaging/task-tracking systems
/// the agent actually draws context from.
pub struct NullContextProvider;

#[async_trait]
impl ContextProvider for NullContextProvider {
    async fn unread_count(&self, _agent_id: &AgentId) -> Result<u32, String> {
        Ok(0)
    }

    async fn unread_messages(&self, _agent_id: &AgentId) -> Result<Vec<String>, String> {
        Ok(Vec::new())
    }

    async fn assigned_tasks(&self, _agent_id: &AgentId) -> Result<Vec<String>, String> {
        Ok(Vec::new())
    }

    async fn project_overrides(
        &self,
        _agent_id: &AgentId,
        _routine_id: Option<&RoutineId>,
    ) -> Result<Option<serde_json::Value>, String> {
        Ok(None)
    }
}
