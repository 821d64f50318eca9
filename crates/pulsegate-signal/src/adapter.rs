use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, warn};

use pulsegate_channels::{Channel, ChannelError, ChannelStatus, InboundMessage, OutboundMessage};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Speaks signal-cli's REST API directly over `reqwest` (no SDK crate
/// exists for it). Inbound delivery polls `/v1/receive/{number}` on a
/// background task, the nearest equivalent to the long-polling adapters
/// use for providers without a push-based transport.
pub struct SignalChannel {
    client: reqwest::Client,
    base_url: String,
    number: String,
    status: RwLock<ChannelStatus>,
    poll_task: RwLock<Option<JoinHandle<()>>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
}

impl SignalChannel {
    pub fn new(base_url: impl Into<String>, number: impl Into<String>, inbound_tx: mpsc::Sender<InboundMessage>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            number: number.into(),
            status: RwLock::new(ChannelStatus::Disconnected),
            poll_task: RwLock::new(None),
            inbound_tx,
        }
    }

    async fn poll_once(client: &reqwest::Client, base_url: &str, number: &str) -> Result<Vec<serde_json::Value>, SignalErr> {
        let url = format!("{base_url}/v1/receive/{number}");
        let resp = client.get(&url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(SignalErr(format!("poll failed ({status})")));
        }
        Ok(resp.json().await.unwrap_or_default())
    }
}

struct SignalErr(String);
impl From<reqwest::Error> for SignalErr {
    fn from(e: reqwest::Error) -> Self {
        SignalErr(e.to_string())
    }
}

#[async_trait]
impl Channel for SignalChannel {
    fn name(&self) -> &str {
        "signal"
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        if self.number.is_empty() {
            return Err(ChannelError::Provider("no phone number configured".into()));
        }
        *self.status.write().await = ChannelStatus::Connected;

        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let number = self.number.clone();
        let tx = self.inbound_tx.clone();
        let task = tokio::spawn(async move {
            loop {
                match Self::poll_once(&client, &base_url, &number).await {
                    Ok(envelopes) => {
                        for envelope in envelopes {
                            let Some(source) = envelope["envelope"]["source"].as_str() else { continue };
                            let Some(text) = envelope["envelope"]["dataMessage"]["message"].as_str() else { continue };
                            let inbound = InboundMessage {
                                channel: "signal".to_string(),
                                sender_identity: source.to_string(),
                                sender_name: envelope["envelope"]["sourceName"].as_str().map(str::to_string),
                                content: text.to_string(),
                                timestamp: Utc::now().to_rfc3339(),
                                attachments: Vec::new(),
                                raw_payload: Some(envelope),
                            };
                            if tx.send(inbound).await.is_err() {
                                warn!("signal: inbound channel closed, stopping poll loop");
                                return;
                            }
                        }
                    }
                    Err(e) => error!(error = %e.0, "signal: poll failed"),
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        });
        *self.poll_task.write().await = Some(task);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        if let Some(task) = self.poll_task.write().await.take() {
            task.abort();
        }
        *self.status.write().await = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let url = format!("{}/v2/send", self.base_url);
        let body = serde_json::json!({
            "message": msg.content,
            "number": self.number,
            "recipients": [msg.recipient_id],
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed(format!("signal api error ({status}): {text}")));
        }
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        self.status.try_read().map(|s| s.clone()).unwrap_or(ChannelStatus::Connecting)
    }
}
