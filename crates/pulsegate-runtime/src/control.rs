use std::sync::Arc;

use async_trait::async_trait;

use pulsegate_commands::{CompactionResult, ContextUsage, SessionControl};
use pulsegate_sessions::{SessionKey, SessionManager};

/// Standalone default [`SessionControl`]: drives the real session store
/// for `/new`, `/model` and `/status`, and reports a synthetic context
/// usage/compaction result for `/context` and `/compact` since those
/// figures come from the external session runner in a real deployment
/// (spec §6 "context-usage queries" is an opaque storage/runner
/// collaborator the core only consumes).
pub struct RuntimeSessionControl {
    sessions: Arc<SessionManager>,
    context_window: u64,
}

impl RuntimeSessionControl {
    pub fn new(sessions: Arc<SessionManager>, context_window: u64) -> Self {
        Self { sessions, context_window }
    }
}

#[async_trait]
impl SessionControl for RuntimeSessionControl {
    async fn stop_session(&self, _key: &SessionKey) -> Result<(), String> {
        // Stopping an in-flight turn is a session-runner concern (spec
        // §6); the runtime's echo runner has nothing in flight to abort.
        Ok(())
    }

    async fn delete_session(&self, key: &SessionKey) -> Result<(), String> {
        self.sessions.delete(key).map_err(|e| e.to_string())
    }

    async fn update_model(&self, key: &SessionKey, model: &str) -> Result<(), String> {
        let session = self.sessions.get(key).map_err(|e| e.to_string())?;
        self.sessions
            .update_stats(key, Some(model), session.message_count, session.total_tokens)
            .map_err(|e| e.to_string())
    }

    async fn context_usage(&self, key: &SessionKey) -> Result<ContextUsage, String> {
        let session = self.sessions.get(key).map_err(|e| e.to_string())?;
        let used_tokens = session.total_tokens;
        let percent = (used_tokens as f32 / self.context_window as f32 * 100.0).min(100.0);
        Ok(ContextUsage {
            percent,
            used_tokens,
            context_window: self.context_window,
            model: session.model.unwrap_or_else(|| "default".to_string()),
        })
    }

    async fn compact(&self, key: &SessionKey, _instructions: Option<&str>) -> Result<CompactionResult, String> {
        let session = self.sessions.get(key).map_err(|e| e.to_string())?;
        let tokens_before = session.total_tokens;
        // No real compaction pipeline in the standalone runner; report a
        // no-op compaction rather than inventing a reduction.
        Ok(CompactionResult { tokens_before, tokens_after: tokens_before })
    }

    async fn list_model_favorites(&self) -> Result<Vec<String>, String> {
        Ok(Vec::new())
    }
}
