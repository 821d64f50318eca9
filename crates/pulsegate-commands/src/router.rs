use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use pulsegate_channels::CommandDispatcher;
use pulsegate_core::AgentId;
use pulsegate_sessions::SessionKey;

use crate::control::SessionControl;
use crate::parse::{parse, Command};

const HELP_TEXT: &str = "\
Available commands:
/help, /start — show this message
/new — start a fresh session
/model <id> — switch models for this conversation
/modelfavs — list favourite models
/context — show context window usage
/compact [instructions] — compact the conversation history
/status — show the active model and context usage";

/// Recognises and executes the in-band commands common to every channel
/// (spec §4.9). The only state kept here is the per-chat model override
/// map; everything else is delegated to [`SessionControl`].
pub struct CommandRouter {
    control: Arc<dyn SessionControl>,
    model_overrides: DashMap<(String, String), String>,
}

impl CommandRouter {
    pub fn new(control: Arc<dyn SessionControl>) -> Self {
        Self { control, model_overrides: DashMap::new() }
    }

    /// The model override recorded for this sender, if any, to be applied
    /// to the *next* message (spec §4.9 `/model`: "always record a
    /// per-sender/per-chat override for the next message").
    pub fn model_override(&self, channel: &str, sender_identity: &str) -> Option<String> {
        self.model_overrides.get(&(channel.to_string(), sender_identity.to_string())).map(|v| v.clone())
    }

    async fn execute(&self, channel: &str, sender_identity: &str, agent_id: Option<&AgentId>, command: Command) -> String {
        match command {
            Command::Help => HELP_TEXT.to_string(),
            Command::New => match agent_id {
                Some(agent) => {
                    let key = SessionKey::new(sender_identity, agent.clone(), "main").with_channel(channel);
                    let result = match self.control.stop_session(&key).await {
                        Ok(()) => self.control.delete_session(&key).await,
                        Err(e) => Err(e),
                    };
                    match result {
                        Ok(()) => "Started a new session.".to_string(),
                        Err(e) => format!("Could not start a new session: {e}"),
                    }
                }
                None => "No active conversation to reset.".to_string(),
            },
            Command::Model(model) => {
                self.model_overrides.insert((channel.to_string(), sender_identity.to_string()), model.clone());
                if let Some(agent) = agent_id {
                    let key = SessionKey::new(sender_identity, agent.clone(), "main").with_channel(channel);
                    if let Err(e) = self.control.update_model(&key, &model).await {
                        return format!("Recorded {model} for next message, but could not update the active session: {e}");
                    }
                }
                format!("Switched to {model}.")
            }
            Command::ModelFavs => match self.control.list_model_favorites().await {
                Ok(favs) if favs.is_empty() => "No favourite models saved yet.".to_string(),
                Ok(favs) => format!("Favourite models:\n{}", favs.join("\n")),
                Err(e) => format!("Could not load favourites: {e}"),
            },
            Command::Context => self.report_context(channel, sender_identity, agent_id).await,
            Command::Status => self.report_context(channel, sender_identity, agent_id).await,
            Command::Compact(instructions) => match agent_id {
                Some(agent) => {
                    let key = SessionKey::new(sender_identity, agent.clone(), "main").with_channel(channel);
                    match self.control.compact(&key, instructions.as_deref()).await {
                        Ok(result) => format!(
                            "Compacted: {} -> {} tokens.",
                            result.tokens_before, result.tokens_after
                        ),
                        Err(e) => format!("Compaction failed: {e}"),
                    }
                }
                None => "No active conversation to compact.".to_string(),
            },
        }
    }

    async fn report_context(&self, channel: &str, sender_identity: &str, agent_id: Option<&AgentId>) -> String {
        let Some(agent) = agent_id else {
            return "No active conversation.".to_string();
        };
        let key = SessionKey::new(sender_identity, agent.clone(), "main").with_channel(channel);
        match self.control.context_usage(&key).await {
            Ok(usage) => format!(
                "Model: {} — {:.0}% of context window ({}/{} tokens).",
                usage.model,
                usage.percent * 100.0,
                usage.used_tokens,
                usage.context_window
            ),
            Err(e) => format!("Could not read context usage: {e}"),
        }
    }
}

#[async_trait]
impl CommandDispatcher for CommandRouter {
    async fn try_dispatch(&self, channel: &str, sender_identity: &str, agent_id: Option<&AgentId>, text: &str) -> Option<String> {
        let command = parse(text)?;
        info!(channel, sender_identity, ?command, "dispatching built-in command");
        Some(self.execute(channel, sender_identity, agent_id, command).await)
    }
}
