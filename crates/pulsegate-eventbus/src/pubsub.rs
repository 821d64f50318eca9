//! Generic pattern-based pub/sub (spec §6 "Pub/sub patterns"): wake
//! notifications, credential hot-reload, and per-channel RPC all flow
//! through the same narrow interface, following the teacher's
//! `EventBroadcaster` (`skynet_gateway::ws::broadcast`) generalized from a
//! single fixed fan-out channel to arbitrary named subjects with
//! glob-style wildcard subscriptions (`agent:*:wake`).

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

const CHANNEL_CAPACITY: usize = 256;

/// A message observed on a subscribed subject.
#[derive(Debug, Clone)]
pub struct PubSubMessage {
    pub subject: String,
    pub payload: Value,
}

#[async_trait]
pub trait PubSub: Send + Sync {
    async fn publish(&self, subject: &str, payload: Value);

    /// Subscribe to a subject pattern (`*` matches exactly one
    /// colon-delimited segment, e.g. `agent:*:wake`). Returns a stream of
    /// every message published to a subject matching `pattern` from this
    /// point forward.
    fn subscribe(&self, pattern: &str) -> BroadcastStream<PubSubMessage>;
}

/// In-process default (SPEC_FULL.md §0: "one concrete in-process
/// implementation of each [external collaborator] so the workspace is
/// runnable standalone").
pub struct InMemoryPubSub {
    /// One broadcast channel per exact pattern ever subscribed to, plus a
    /// firehose channel every publish also lands on so wildcard
    /// subscribers created after the fact still see live traffic.
    topics: DashMap<String, broadcast::Sender<PubSubMessage>>,
    firehose: broadcast::Sender<PubSubMessage>,
}

impl InMemoryPubSub {
    pub fn new() -> Self {
        let (firehose, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            topics: DashMap::new(),
            firehose,
        }
    }
}

impl Default for InMemoryPubSub {
    fn default() -> Self {
        Self::new()
    }
}

fn pattern_matches(pattern: &str, subject: &str) -> bool {
    let p: Vec<&str> = pattern.split(':').collect();
    let s: Vec<&str> = subject.split(':').collect();
    if p.len() != s.len() {
        return false;
    }
    p.iter().zip(s.iter()).all(|(pp, ss)| *pp == "*" || pp == ss)
}

#[async_trait]
impl PubSub for InMemoryPubSub {
    async fn publish(&self, subject: &str, payload: Value) {
        let message = PubSubMessage {
            subject: subject.to_string(),
            payload,
        };
        // Best-effort fan-out: a channel with no subscribers returns an
        // error that we intentionally ignore (spec §7 "transient I/O …
        // never fatal").
        let _ = self.firehose.send(message.clone());
        for entry in self.topics.iter() {
            if pattern_matches(entry.key(), subject) {
                let _ = entry.value().send(message.clone());
            }
        }
    }

    fn subscribe(&self, pattern: &str) -> BroadcastStream<PubSubMessage> {
        let sender = self
            .topics
            .entry(pattern.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone();
        BroadcastStream::new(sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn wildcard_pattern_matches_any_agent() {
        let bus = InMemoryPubSub::new();
        let mut rx = bus.subscribe("agent:*:wake");
        bus.publish("agent:alice:wake", serde_json::json!({"from": "bob"})).await;

        let msg = rx.next().await.unwrap().unwrap();
        assert_eq!(msg.subject, "agent:alice:wake");
    }

    #[tokio::test]
    async fn non_matching_subject_is_not_delivered() {
        let bus = InMemoryPubSub::new();
        let mut rx = bus.subscribe("agent:*:wake");
        bus.publish("channel:credentials-changed", serde_json::json!({})).await;
        bus.publish("agent:alice:wake", serde_json::json!({"from": "bob"})).await;

        let msg = rx.next().await.unwrap().unwrap();
        assert_eq!(msg.subject, "agent:alice:wake");
    }
}
