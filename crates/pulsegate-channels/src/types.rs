use serde::{Deserialize, Serialize};

/// A message received from an external channel (Telegram, Discord,
/// WhatsApp, Signal, …), generalized from the teacher's
/// `skynet_channels::types::InboundMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel: String,
    /// Normalised sender identity: E.164 for phone-based channels, an
    /// opaque provider id for account-based ones (spec §4.8 step 1).
    pub sender_identity: String,
    pub sender_name: Option<String>,
    pub content: String,
    pub timestamp: String,
    /// Pre-download references; bytes are fetched in step 7 but not
    /// uploaded until the session exists (spec §4.8 step 7, 9).
    pub attachments: Vec<Attachment>,
    pub raw_payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub provider_ref: String,
    pub mime_type: Option<String>,
    pub bytes: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub recipient_id: String,
    pub content: String,
    pub format: MessageFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    #[default]
    PlainText,
    Markdown,
    Html,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Connected,
    Connecting,
    Disconnected,
    Error(String),
}
