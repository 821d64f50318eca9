use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use pulsegate_channels::{ChannelError, Result as ChannelResult, SessionRunnerBridge};
use pulsegate_core::capability::{SessionContext, SessionResult, SessionRunner};
use pulsegate_core::AgentId;
use pulsegate_sessions::{SessionKey, SessionManager};

/// Standalone default pulse-session runner: records the pulse and reports
/// success with no actions taken. A real deployment wires this to the
/// external agent process the spec's capability traits are written
/// against (SPEC_FULL.md §0).
pub struct EchoSessionRunner;

#[async_trait]
impl SessionRunner for EchoSessionRunner {
    async fn run_session(&self, agent_id: &AgentId, context: SessionContext) -> SessionResult {
        info!(%agent_id, routine = ?context.routine_name, "standalone runner: pulse acknowledged");
        SessionResult { success: true, actions: Vec::new(), output: None }
    }
}

/// Standalone default channel-session runner: echoes the inbound text
/// back and records the exchange against the session's stats. Swappable
/// for a bridge into the real agent/session-streamer process.
pub struct EchoRunnerBridge {
    sessions: Arc<SessionManager>,
}

impl EchoRunnerBridge {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl SessionRunnerBridge for EchoRunnerBridge {
    async fn run_turn(&self, session_key: &SessionKey, agent_id: &AgentId, text: &str) -> ChannelResult<String> {
        let reply = format!("Echo from {agent_id}: {text}");
        if let Ok(session) = self.sessions.get(session_key) {
            let tokens = session.total_tokens + (text.len() as u64 / 4).max(1);
            self.sessions
                .update_stats(session_key, session.model.as_deref(), session.message_count + 1, tokens)
                .map_err(ChannelError::from)?;
        }
        Ok(reply)
    }
}
