use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use pulsegate_channels::{Channel, ChannelError, ChannelStatus, InboundMessage, OutboundMessage};

use crate::formatter::escape_markdown_v2;

/// Wraps a teloxide `Bot` and drives the long-polling `Dispatcher` until
/// disconnected. One adapter instance owns exactly one bot token (spec
/// §4.8: "each adapter owns a single OS-level connection to the channel
/// provider").
pub struct TelegramChannel {
    bot_token: String,
    bot: RwLock<Option<Bot>>,
    status: RwLock<ChannelStatus>,
    inbound_tx: mpsc::Sender<InboundMessage>,
}

impl TelegramChannel {
    pub fn new(bot_token: impl Into<String>, inbound_tx: mpsc::Sender<InboundMessage>) -> Self {
        Self {
            bot_token: bot_token.into(),
            bot: RwLock::new(None),
            status: RwLock::new(ChannelStatus::Disconnected),
            inbound_tx,
        }
    }

    /// Drives the long-polling dispatcher until the bot is dropped or the
    /// process exits. Spawn this once after `connect`.
    pub async fn run_dispatcher(&self) {
        let bot = { self.bot.read().await.clone() };
        let Some(bot) = bot else {
            warn!("telegram: run_dispatcher called before connect");
            return;
        };

        let tx = self.inbound_tx.clone();
        let handler = Update::filter_message().endpoint(move |msg: Message| {
            let tx = tx.clone();
            async move {
                if let Some(text) = msg.text() {
                    let inbound = InboundMessage {
                        channel: "telegram".to_string(),
                        sender_identity: msg.chat.id.0.to_string(),
                        sender_name: msg.from.as_ref().and_then(|u| u.username.clone()),
                        content: text.to_string(),
                        timestamp: Utc::now().to_rfc3339(),
                        attachments: Vec::new(),
                        raw_payload: None,
                    };
                    if tx.send(inbound).await.is_err() {
                        warn!("telegram: inbound channel closed, dropping message");
                    }
                }
                respond(())
            }
        });

        info!("telegram: starting long-polling dispatcher");
        Dispatcher::builder(bot, handler)
            .default_handler(|_upd| async {})
            .build()
            .dispatch()
            .await;
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        if self.bot_token.is_empty() {
            return Err(ChannelError::Provider("no bot token configured".into()));
        }
        *self.status.write().await = ChannelStatus::Connecting;
        let bot = Bot::new(&self.bot_token);
        *self.bot.write().await = Some(bot);
        *self.status.write().await = ChannelStatus::Connected;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        *self.bot.write().await = None;
        *self.status.write().await = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let bot = self.bot.read().await.clone().ok_or(ChannelError::NotConnected)?;
        let chat_id = msg
            .recipient_id
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| ChannelError::SendFailed(format!("invalid telegram chat id: {}", msg.recipient_id)))?;

        let escaped = escape_markdown_v2(&msg.content);
        if bot.send_message(chat_id, &escaped).parse_mode(ParseMode::MarkdownV2).await.is_err() {
            // MarkdownV2 rejected the escaping; fall back to plain text.
            bot.send_message(chat_id, &msg.content).await.map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        // `try_read` avoids making `status` async; under contention this
        // is only ever held briefly by `connect`/`disconnect`/`send`.
        self.status.try_read().map(|s| s.clone()).unwrap_or(ChannelStatus::Connecting)
    }
}

pub fn inbound_channel() -> (mpsc::Sender<InboundMessage>, mpsc::Receiver<InboundMessage>) {
    mpsc::channel(256)
}

pub type SharedTelegramChannel = Arc<TelegramChannel>;
