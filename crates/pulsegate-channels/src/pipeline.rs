use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use pulsegate_core::AgentId;
use pulsegate_sessions::{SessionKey, SessionManager, StickyKey};

use crate::channel::Channel;
use crate::error::{ChannelError, Result};
use crate::outbound::{chunk_text, OutboundFormatter};
use crate::types::{Attachment, InboundMessage, MessageFormat, OutboundMessage};

/// Overall budget for collecting a streamed reply before the channel
/// reports failure (spec §4.8 step 12, §5 "Channel inbound processing
/// uses a 120 s overall timeout").
const REPLY_TIMEOUT: Duration = Duration::from_secs(120);

#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    /// Returns `Some(reply)` if `text` was a recognised built-in command
    /// (spec §4.9), in which case routing and the session runner are
    /// never reached.
    async fn try_dispatch(&self, channel: &str, sender_identity: &str, agent_id: Option<&AgentId>, text: &str) -> Option<String>;
}

#[async_trait]
pub trait TypingIndicator: Send + Sync {
    async fn start(&self, recipient_id: &str);
    async fn stop(&self, recipient_id: &str);
}

#[async_trait]
pub trait ReadReceiptSender: Send + Sync {
    async fn acknowledge(&self, recipient_id: &str);
}

#[async_trait]
pub trait AttachmentUploader: Send + Sync {
    async fn upload(&self, session_id: &str, attachment: &Attachment) -> Result<()>;
}

/// Runs or resumes a session and returns the streamed assistant reply
/// (spec §4.8 steps 8-12). Message persistence and forwarding live
/// behind this narrow contract so the pipeline itself stays decoupled
/// from the agent-runner and durable-storage concerns.
#[async_trait]
pub trait SessionRunnerBridge: Send + Sync {
    async fn run_turn(&self, session_key: &SessionKey, agent_id: &AgentId, text: &str) -> Result<String>;
}

pub struct PipelineConfig {
    pub allow_all: bool,
    pub sticky_ttl_minutes: u64,
    pub channel_default_agent: Option<AgentId>,
    pub fallback_agent: Option<AgentId>,
}

/// Drives the common 13-step inbound pipeline every channel adapter
/// shares (spec §4.8 "Inbound pipeline").
pub struct InboundPipeline {
    sessions: Arc<SessionManager>,
    commands: Arc<dyn CommandDispatcher>,
    typing: Arc<dyn TypingIndicator>,
    runner: Arc<dyn SessionRunnerBridge>,
    formatter: Arc<dyn OutboundFormatter>,
    read_receipts: Option<Arc<dyn ReadReceiptSender>>,
    uploader: Option<Arc<dyn AttachmentUploader>>,
    config: PipelineConfig,
}

impl InboundPipeline {
    pub fn new(
        sessions: Arc<SessionManager>,
        commands: Arc<dyn CommandDispatcher>,
        typing: Arc<dyn TypingIndicator>,
        runner: Arc<dyn SessionRunnerBridge>,
        formatter: Arc<dyn OutboundFormatter>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            sessions,
            commands,
            typing,
            runner,
            formatter,
            read_receipts: None,
            uploader: None,
            config,
        }
    }

    pub fn with_read_receipts(mut self, sender: Arc<dyn ReadReceiptSender>) -> Self {
        self.read_receipts = Some(sender);
        self
    }

    pub fn with_attachment_uploader(mut self, uploader: Arc<dyn AttachmentUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub async fn handle(&self, channel: &dyn Channel, message: InboundMessage) -> Result<()> {
        // Step 2: allowlist check (sender identity arrives pre-normalised
        // by the adapter per spec §4.8 step 1).
        if !self.config.allow_all
            && self.sessions.allowlist_entry(&message.channel, &message.sender_identity)?.is_none()
        {
            warn!(sender = %message.sender_identity, channel = %message.channel, "sender rejected by allowlist");
            return Err(ChannelError::NotAllowlisted);
        }

        // Step 3: read receipt / ack, best-effort.
        if let Some(receipts) = &self.read_receipts {
            receipts.acknowledge(&message.sender_identity).await;
        }

        // Step 4: built-in command check.
        let target_agent_hint = self.resolve_target_agent(&message).await?;
        if let Some(reply) = self
            .commands
            .try_dispatch(&message.channel, &message.sender_identity, target_agent_hint.as_ref(), &message.content)
            .await
        {
            self.send_reply(channel, &message.sender_identity, &reply).await?;
            return Ok(());
        }

        // Step 5: resolve target agent (sticky > allowlist default >
        // channel default > first registered fallback).
        let agent_id = target_agent_hint.ok_or(ChannelError::NoTargetAgent)?;

        // Step 6: typing keepalive.
        self.typing.start(&message.sender_identity).await;

        let session_key = SessionKey::new(message.sender_identity.clone(), agent_id.clone(), "main")
            .with_channel(message.channel.clone());

        // Step 7 (pre-download) happened upstream in the adapter; step 8:
        // start or resume the session before any upload.
        let session = self.sessions.get_or_create(&session_key)?;

        // Step 9: upload media now that the session exists.
        if let Some(uploader) = &self.uploader {
            for attachment in &message.attachments {
                uploader.upload(&session.id, attachment).await?;
            }
        }

        // Steps 10-12: persist + forward + collect streamed reply, capped
        // at the overall inbound timeout.
        let reply_result = tokio::time::timeout(REPLY_TIMEOUT, self.runner.run_turn(&session_key, &agent_id, &message.content)).await;
        self.typing.stop(&message.sender_identity).await;
        let reply = reply_result.map_err(|_| ChannelError::Timeout("session reply".into()))??;

        // Step 13: format, chunk, send, update sticky map.
        self.send_reply(channel, &message.sender_identity, &reply).await?;
        self.sessions.set_sticky_route(
            StickyKey { channel: message.channel.clone(), sender_identity: message.sender_identity.clone() },
            &agent_id,
            Utc::now().timestamp_millis(),
        )?;

        Ok(())
    }

    async fn resolve_target_agent(&self, message: &InboundMessage) -> Result<Option<AgentId>> {
        if let Some(agent) = self.sessions.sticky_route(
            &message.channel,
            &message.sender_identity,
            self.config.sticky_ttl_minutes,
            Utc::now().timestamp_millis(),
        )? {
            return Ok(Some(agent));
        }
        if let Some(entry) = self.sessions.allowlist_entry(&message.channel, &message.sender_identity)? {
            if let Some(agent) = entry.default_agent_id {
                return Ok(Some(agent));
            }
        }
        if let Some(agent) = &self.config.channel_default_agent {
            return Ok(Some(agent.clone()));
        }
        Ok(self.config.fallback_agent.clone())
    }

    async fn send_reply(&self, channel: &dyn Channel, recipient_id: &str, reply: &str) -> Result<()> {
        let formatted = self.formatter.format(reply);
        let limit = self.formatter.chunk_limit();
        for chunk in chunk_text(&formatted, limit) {
            let outbound = OutboundMessage {
                channel: channel.name().to_string(),
                recipient_id: recipient_id.to_string(),
                content: chunk,
                format: MessageFormat::Markdown,
            };
            channel.send(&outbound).await?;
        }
        info!(recipient = %recipient_id, "reply delivered");
        Ok(())
    }
}
