//! Command Dispatcher (spec §4.9): in-band slash commands recognised by
//! every channel before routing to an agent.

pub mod control;
pub mod parse;
pub mod router;

pub use control::{CompactionResult, ContextUsage, SessionControl};
pub use parse::{parse, Command};
pub use router::CommandRouter;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use pulsegate_channels::CommandDispatcher;
    use pulsegate_core::AgentId;
    use pulsegate_sessions::SessionKey;

    use super::*;

    struct FakeControl;

    #[async_trait]
    impl SessionControl for FakeControl {
        async fn stop_session(&self, _key: &SessionKey) -> Result<(), String> {
            Ok(())
        }
        async fn delete_session(&self, _key: &SessionKey) -> Result<(), String> {
            Ok(())
        }
        async fn update_model(&self, _key: &SessionKey, _model: &str) -> Result<(), String> {
            Ok(())
        }
        async fn context_usage(&self, _key: &SessionKey) -> Result<ContextUsage, String> {
            Ok(ContextUsage { percent: 0.42, used_tokens: 4200, context_window: 10_000, model: "claude".into() })
        }
        async fn compact(&self, _key: &SessionKey, _instructions: Option<&str>) -> Result<CompactionResult, String> {
            Ok(CompactionResult { tokens_before: 10_000, tokens_after: 3_000 })
        }
        async fn list_model_favorites(&self) -> Result<Vec<String>, String> {
            Ok(vec!["claude-opus".to_string(), "claude-sonnet".to_string()])
        }
    }

    #[tokio::test]
    async fn non_command_text_is_not_dispatched() {
        let router = CommandRouter::new(Arc::new(FakeControl));
        assert!(router.try_dispatch("telegram", "u1", Some(&AgentId::new("main")), "hello").await.is_none());
    }

    #[tokio::test]
    async fn model_command_records_override_and_updates_active_session() {
        let router = CommandRouter::new(Arc::new(FakeControl));
        let reply = router.try_dispatch("telegram", "u1", Some(&AgentId::new("main")), "/model gpt-5").await;
        assert_eq!(reply, Some("Switched to gpt-5.".to_string()));
        assert_eq!(router.model_override("telegram", "u1"), Some("gpt-5".to_string()));
    }

    #[tokio::test]
    async fn status_reports_context_usage() {
        let router = CommandRouter::new(Arc::new(FakeControl));
        let reply = router.try_dispatch("telegram", "u1", Some(&AgentId::new("main")), "/status").await.unwrap();
        assert!(reply.contains("claude"));
        assert!(reply.contains("42%"));
    }

    #[tokio::test]
    async fn new_without_an_active_agent_does_not_panic() {
        let router = CommandRouter::new(Arc::new(FakeControl));
        let reply = router.try_dispatch("telegram", "u1", None, "/new").await;
        assert_eq!(reply, Some("No active conversation to reset.".to_string()));
    }
}
