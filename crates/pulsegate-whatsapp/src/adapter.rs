use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tracing::warn;

use pulsegate_channels::{Channel, ChannelError, ChannelStatus, InboundMessage, OutboundMessage};

use crate::error::WhatsAppError;
use crate::lid_map::LidMap;

/// Speaks the WhatsApp Cloud API's REST surface directly over `reqwest`
/// (no SDK crate exists for it). Inbound delivery is webhook-driven
/// rather than a persistent connection; [`WhatsAppChannel::handle_webhook`]
/// is called by the runtime's HTTP server on each POST.
pub struct WhatsAppChannel {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    phone_number_id: String,
    status: RwLock<ChannelStatus>,
    lid_map: Arc<LidMap>,
    inbound_tx: mpsc::Sender<InboundMessage>,
}

impl WhatsAppChannel {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        phone_number_id: impl Into<String>,
        lid_map: Arc<LidMap>,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            access_token: access_token.into(),
            phone_number_id: phone_number_id.into(),
            status: RwLock::new(ChannelStatus::Disconnected),
            lid_map,
            inbound_tx,
        }
    }

    /// Parses a Cloud API webhook delivery and forwards any text messages
    /// it contains. Resolves the sender's LID against the persisted map
    /// when the payload carries one, recording new mappings as they
    /// arrive.
    pub async fn handle_webhook(&self, payload: &Value) -> Result<(), WhatsAppError> {
        let entries = payload["entry"].as_array().ok_or_else(|| WhatsAppError::MalformedWebhook("missing entry[]".into()))?;
        for entry in entries {
            let Some(changes) = entry["changes"].as_array() else { continue };
            for change in changes {
                let value = &change["value"];
                let Some(messages) = value["messages"].as_array() else { continue };
                for message in messages {
                    self.forward_message(value, message).await?;
                }
            }
        }
        Ok(())
    }

    async fn forward_message(&self, value: &Value, message: &Value) -> Result<(), WhatsAppError> {
        let Some(text) = message["text"]["body"].as_str() else { return Ok(()) };
        let wa_id = message["from"].as_str().unwrap_or_default().to_string();

        let contact = value["contacts"].as_array().and_then(|c| c.first());
        let sender_name = contact.and_then(|c| c["profile"]["name"].as_str()).map(str::to_string);
        let lid = contact.and_then(|c| c["user_id"].as_str());

        if let Some(lid) = lid {
            self.lid_map.put(lid, &wa_id, Utc::now().timestamp_millis())?;
        }

        let inbound = InboundMessage {
            channel: "whatsapp".to_string(),
            sender_identity: wa_id,
            sender_name,
            content: text.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            attachments: Vec::new(),
            raw_payload: Some(message.clone()),
        };
        if self.inbound_tx.send(inbound).await.is_err() {
            warn!("whatsapp: inbound channel closed, dropping message");
        }
        Ok(())
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        if self.phone_number_id.is_empty() || self.access_token.is_empty() {
            return Err(ChannelError::Provider("no WhatsApp credentials configured".into()));
        }
        *self.status.write().await = ChannelStatus::Connected;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        *self.status.write().await = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);
        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": msg.recipient_id,
            "type": "text",
            "text": { "body": msg.content },
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed(format!("whatsapp api error ({status}): {text}")));
        }
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        self.status.try_read().map(|s| s.clone()).unwrap_or(ChannelStatus::Connecting)
    }
}
