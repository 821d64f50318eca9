use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serenity::all::{Context, EventHandler, GatewayIntents, Message};
use serenity::http::Http;
use serenity::Client;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, warn};

use pulsegate_channels::{Channel, ChannelError, ChannelStatus, InboundMessage, OutboundMessage};

struct Handler {
    tx: mpsc::Sender<InboundMessage>,
}

#[serenity::async_trait]
impl EventHandler for Handler {
    async fn message(&self, _ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let inbound = InboundMessage {
            channel: "discord".to_string(),
            sender_identity: msg.channel_id.to_string(),
            sender_name: Some(msg.author.name.clone()),
            content: msg.content.clone(),
            timestamp: Utc::now().to_rfc3339(),
            attachments: Vec::new(),
            raw_payload: None,
        };
        if self.tx.send(inbound).await.is_err() {
            warn!("discord: inbound channel closed, dropping message");
        }
    }
}

/// Wraps a serenity `Client` and drives its gateway event loop on a
/// background task. Reconnection across dropped gateways is handled by
/// [`pulsegate_channels::ChannelManager`] calling `connect` again, rather
/// than an internal retry loop (spec §4.8).
pub struct DiscordChannel {
    bot_token: String,
    http: Arc<RwLock<Option<Arc<Http>>>>,
    status: Arc<RwLock<ChannelStatus>>,
    gateway_task: RwLock<Option<JoinHandle<()>>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
}

impl DiscordChannel {
    pub fn new(bot_token: impl Into<String>, inbound_tx: mpsc::Sender<InboundMessage>) -> Self {
        Self {
            bot_token: bot_token.into(),
            http: Arc::new(RwLock::new(None)),
            status: Arc::new(RwLock::new(ChannelStatus::Disconnected)),
            gateway_task: RwLock::new(None),
            inbound_tx,
        }
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        if self.bot_token.is_empty() {
            return Err(ChannelError::Provider("no bot token configured".into()));
        }
        *self.status.write().await = ChannelStatus::Connecting;

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let handler = Handler { tx: self.inbound_tx.clone() };
        let mut client = Client::builder(&self.bot_token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| ChannelError::Provider(e.to_string()))?;

        *self.http.write().await = Some(client.http.clone());
        *self.status.write().await = ChannelStatus::Connected;

        let status = Arc::clone(&self.status);
        let task = tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!(error = %e, "discord: gateway error");
            }
            *status.write().await = ChannelStatus::Disconnected;
        });
        *self.gateway_task.write().await = Some(task);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        if let Some(task) = self.gateway_task.write().await.take() {
            task.abort();
        }
        *self.http.write().await = None;
        *self.status.write().await = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let http = self.http.read().await.clone().ok_or(ChannelError::NotConnected)?;
        let channel_id: u64 = msg
            .recipient_id
            .parse()
            .map_err(|_| ChannelError::SendFailed(format!("invalid discord channel id: {}", msg.recipient_id)))?;
        serenity::model::id::ChannelId::new(channel_id)
            .say(&http, &msg.content)
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        self.status.try_read().map(|s| s.clone()).unwrap_or(ChannelStatus::Connecting)
    }
}
