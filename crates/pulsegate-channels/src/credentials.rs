use std::sync::Arc;

use async_trait::async_trait;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use pulsegate_eventbus::PubSub;
use pulsegate_protocol::frames::CredentialsChanged;
use pulsegate_protocol::methods::CREDENTIALS_CHANGED;

/// Rebuilds and restarts a single agent/channel adapter in response to a
/// credential change (spec §4.8 "Credential hot-reload").
#[async_trait]
pub trait AdapterRebuilder: Send + Sync {
    async fn stop(&self, agent_id: &str, channel: &str);
    /// Re-fetch credentials and restart; not called for "removed" payloads.
    async fn rebuild_and_restart(&self, agent_id: &str, channel: &str);
}

pub struct CredentialWatcher {
    rebuilder: Arc<dyn AdapterRebuilder>,
}

impl CredentialWatcher {
    pub fn new(rebuilder: Arc<dyn AdapterRebuilder>) -> Self {
        Self { rebuilder }
    }

    /// Subscribes to `channel:credentials-changed` and drives hot-reload
    /// until the pub/sub stream ends.
    pub async fn run(self: Arc<Self>, pubsub: Arc<dyn PubSub>) {
        let mut stream = pubsub.subscribe(CREDENTIALS_CHANGED);
        info!(subject = CREDENTIALS_CHANGED, "credential watcher subscribed");
        while let Some(Ok(message)) = stream.next().await {
            let payload: CredentialsChanged = match serde_json::from_value(message.payload) {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "credential watcher: malformed payload");
                    continue;
                }
            };
            self.rebuilder.stop(&payload.agent_id, &payload.channel).await;
            if payload.removed {
                info!(agent_id = %payload.agent_id, channel = %payload.channel, "credentials removed, adapter stopped without restart");
                continue;
            }
            self.rebuilder.rebuild_and_restart(&payload.agent_id, &payload.channel).await;
            info!(agent_id = %payload.agent_id, channel = %payload.channel, "adapter rebuilt and restarted after credential change");
        }
    }
}
