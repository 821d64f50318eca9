use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use pulsegate_channels::{ChannelManager, OutboundMessage, RpcHandler};
use pulsegate_protocol::methods::{RESTART, SEND, STATUS};

/// Serves the generic RPC methods common to every bridge — `send`,
/// `status`, `restart` (spec §4.8 "RPC surface"). Channels with linking
/// (`link`, `pairing_code`, …) are out of scope for the in-process
/// default adapters this runner ships (none of them implement QR/pairing
/// flows), so those methods report "not supported" here rather than
/// being silently ignored.
pub struct GenericRpcHandler {
    channel: String,
    manager: Arc<tokio::sync::RwLock<ChannelManager>>,
}

impl GenericRpcHandler {
    pub fn new(channel: impl Into<String>, manager: Arc<tokio::sync::RwLock<ChannelManager>>) -> Self {
        Self { channel: channel.into(), manager }
    }
}

#[async_trait]
impl RpcHandler for GenericRpcHandler {
    async fn handle(&self, method: &str, params: Option<Value>) -> Result<Value, String> {
        match method {
            STATUS => {
                let manager = self.manager.read().await;
                let status = manager
                    .get(&self.channel)
                    .map(|c| format!("{:?}", c.status()))
                    .ok_or_else(|| format!("channel {} not registered", self.channel))?;
                Ok(json!({ "channel": self.channel, "status": status }))
            }
            SEND => {
                let params = params.ok_or("send requires params")?;
                let recipient_id = params["recipient_id"].as_str().ok_or("missing recipient_id")?.to_string();
                let content = params["content"].as_str().ok_or("missing content")?.to_string();
                let manager = self.manager.read().await;
                let channel = manager.get(&self.channel).ok_or_else(|| format!("channel {} not registered", self.channel))?;
                let outbound = OutboundMessage {
                    channel: self.channel.clone(),
                    recipient_id,
                    content,
                    format: Default::default(),
                };
                channel.send(&outbound).await.map_err(|e| e.to_string())?;
                Ok(json!({ "sent": true }))
            }
            RESTART => Err("restart must be performed by the process supervisor in standalone mode".to_string()),
            other => Err(format!("unsupported method: {other}")),
        }
    }
}
