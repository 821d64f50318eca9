use async_trait::async_trait;

use pulsegate_sessions::SessionKey;

#[derive(Debug, Clone)]
pub struct ContextUsage {
    pub percent: f32,
    pub used_tokens: u64,
    pub context_window: u64,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct CompactionResult {
    pub tokens_before: u64,
    pub tokens_after: u64,
}

/// Narrow session-affecting surface the command dispatcher drives (spec
/// §4.9: "the dispatcher owns no state beyond the per-chat model
/// override map; all other state lives in the session").
#[async_trait]
pub trait SessionControl: Send + Sync {
    async fn stop_session(&self, key: &SessionKey) -> Result<(), String>;
    async fn delete_session(&self, key: &SessionKey) -> Result<(), String>;
    async fn update_model(&self, key: &SessionKey, model: &str) -> Result<(), String>;
    async fn context_usage(&self, key: &SessionKey) -> Result<ContextUsage, String>;
    async fn compact(&self, key: &SessionKey, instructions: Option<&str>) -> Result<CompactionResult, String>;
    async fn list_model_favorites(&self) -> Result<Vec<String>, String>;
}
