use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use pulsegate_eventbus::PubSub;
use pulsegate_protocol::frames::{RpcReply, RpcRequest};
use pulsegate_protocol::methods::{rpc_reply_subject, rpc_request_subject};

/// Serves one channel bridge's RPC surface (spec §4.8 "RPC surface"):
/// `send`, `status`, `restart`, and — for channels with linking —
/// `link`, `link_status`, `pairing_code`, `unlink`.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn handle(&self, method: &str, params: Option<Value>) -> Result<Value, String>;
}

pub struct RpcListener {
    channel: String,
    handler: Arc<dyn RpcHandler>,
}

impl RpcListener {
    pub fn new(channel: impl Into<String>, handler: Arc<dyn RpcHandler>) -> Self {
        Self { channel: channel.into(), handler }
    }

    /// Runs until the pub/sub stream ends. Held lock or not, every
    /// instance runs its RPC listener (spec §4.8 "Other instances without
    /// the lock still run the RPC listener").
    pub async fn run(self: Arc<Self>, pubsub: Arc<dyn PubSub>) {
        let subject = rpc_request_subject(&self.channel);
        let mut stream = pubsub.subscribe(&subject);
        info!(channel = %self.channel, %subject, "rpc listener subscribed");
        while let Some(Ok(message)) = stream.next().await {
            let request: RpcRequest = match serde_json::from_value(message.payload) {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "rpc listener: malformed request");
                    continue;
                }
            };
            let reply = match self.handler.handle(&request.method, request.params.clone()).await {
                Ok(payload) => RpcReply::ok(request.id.clone(), payload),
                Err(message) => RpcReply::err(request.id.clone(), message),
            };
            let reply_subject = rpc_reply_subject(&self.channel, &request.id);
            let payload = serde_json::to_value(&reply).unwrap_or(Value::Null);
            pubsub.publish(&reply_subject, payload).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsegate_eventbus::InMemoryPubSub;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl RpcHandler for EchoHandler {
        async fn handle(&self, method: &str, _params: Option<Value>) -> Result<Value, String> {
            if method == "status" {
                Ok(json!({"status": "connected"}))
            } else {
                Err(format!("unknown method {method}"))
            }
        }
    }

    #[tokio::test]
    async fn replies_are_published_to_the_request_scoped_subject() {
        let pubsub: Arc<dyn PubSub> = Arc::new(InMemoryPubSub::new());
        let listener = Arc::new(RpcListener::new("telegram", Arc::new(EchoHandler)));
        let mut replies = pubsub.subscribe(&rpc_reply_subject("telegram", "req-1"));
        tokio::spawn(listener.run(pubsub.clone()));

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let request = RpcRequest { id: "req-1".into(), method: "status".into(), params: None };
        pubsub
            .publish(&rpc_request_subject("telegram"), serde_json::to_value(&request).unwrap())
            .await;

        let reply = replies.next().await.unwrap().unwrap();
        let parsed: RpcReply = serde_json::from_value(reply.payload).unwrap();
        assert!(parsed.ok);
    }
}
