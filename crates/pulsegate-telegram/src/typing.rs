use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use teloxide::prelude::*;
use teloxide::types::ChatAction;
use tokio::task::JoinHandle;

use pulsegate_channels::TypingIndicator;

/// Refreshes the "typing…" indicator every 4 seconds; Telegram's own
/// status expires after about 5.
const REFRESH: Duration = Duration::from_secs(4);

pub struct TelegramTyping {
    bot: Bot,
    handles: DashMap<String, JoinHandle<()>>,
}

impl TelegramTyping {
    pub fn new(bot: Bot) -> Self {
        Self { bot, handles: DashMap::new() }
    }
}

#[async_trait]
impl TypingIndicator for TelegramTyping {
    async fn start(&self, recipient_id: &str) {
        let Ok(raw) = recipient_id.parse::<i64>() else { return };
        let chat_id = ChatId(raw);
        let bot = self.bot.clone();
        let handle = tokio::spawn(async move {
            loop {
                let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;
                tokio::time::sleep(REFRESH).await;
            }
        });
        if let Some((_, previous)) = self.handles.remove(recipient_id) {
            previous.abort();
        }
        self.handles.insert(recipient_id.to_string(), handle);
    }

    async fn stop(&self, recipient_id: &str) {
        if let Some((_, handle)) = self.handles.remove(recipient_id) {
            handle.abort();
        }
    }
}
