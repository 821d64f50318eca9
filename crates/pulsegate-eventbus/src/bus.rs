//! Durable per-session event stream (spec §4.5): `publish`, `subscribe`,
//! and cursor-based `replayFrom`, with the no-duplication handoff
//! guarantee spec §4.5/§9 require ("live and replayed events are not
//! duplicated across the handoff boundary when the subscriber supplies
//! the cursor it last saw"). Grounded in the teacher's
//! `EventBroadcaster` (`skynet_gateway::ws::broadcast`) generalized from
//! a single global fan-out channel to one bounded, replayable ring
//! buffer per session key.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use pulsegate_protocol::frames::StreamEvent;

/// Events retained per session for replay. Past this many events the
/// oldest are evicted and a reconnect with an older cursor is told to
/// re-sync from storage (spec §4.7 "replay_truncated").
const DEFAULT_RETENTION: usize = 2048;
const BROADCAST_CAPACITY: usize = 512;

struct SessionStream {
    history: VecDeque<StreamEvent>,
    next_id: u64,
    tx: broadcast::Sender<StreamEvent>,
}

impl SessionStream {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            history: VecDeque::new(),
            next_id: 1,
            tx,
        }
    }
}

/// Result of a replay request (spec §4.5 `replayFrom`, §4.7 "Truncated
/// replay").
#[derive(Debug, Clone)]
pub enum Replay {
    Events(Vec<StreamEvent>),
    /// The requested cursor is older than this session's retained
    /// history; the caller must re-sync from durable storage (spec §4.7).
    Truncated,
}

pub struct EventBus {
    sessions: DashMap<String, Mutex<SessionStream>>,
    retention: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            retention,
        }
    }

    /// Publish one event to `session_key`'s stream, assigning the next
    /// monotonic `event_id` (spec §9 "the event bus implementation must
    /// assign these server-side").
    pub fn publish(
        &self,
        session_key: &str,
        event_type: &str,
        tool_call_id: Option<String>,
        payload: Value,
    ) -> StreamEvent {
        let entry = self
            .sessions
            .entry(session_key.to_string())
            .or_insert_with(|| Mutex::new(SessionStream::new()));
        let mut stream = entry.lock().unwrap();

        let event = StreamEvent {
            event_id: stream.next_id,
            event_type: event_type.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            tool_call_id,
            payload,
        };
        stream.next_id += 1;
        stream.history.push_back(event.clone());
        while stream.history.len() > self.retention {
            stream.history.pop_front();
        }
        // No subscribers is not an error (spec §7 "transient … never
        // fatal"); the event still lives in history for later replay.
        let _ = stream.tx.send(event.clone());
        event
    }

    /// Replay every event after `since_cursor` (spec §4.5 `replayFrom`).
    /// `since_cursor = None` replays the full retained history.
    pub fn replay_from(&self, session_key: &str, since_cursor: Option<u64>) -> Replay {
        let Some(entry) = self.sessions.get(session_key) else {
            return Replay::Events(Vec::new());
        };
        let stream = entry.lock().unwrap();
        self.replay_locked(&stream, since_cursor)
    }

    fn replay_locked(&self, stream: &SessionStream, since_cursor: Option<u64>) -> Replay {
        match since_cursor {
            None => Replay::Events(stream.history.iter().cloned().collect()),
            Some(cursor) => {
                if let Some(oldest) = stream.history.front() {
                    if oldest.event_id > cursor + 1 {
                        return Replay::Truncated;
                    }
                }
                Replay::Events(
                    stream
                        .history
                        .iter()
                        .filter(|e| e.event_id > cursor)
                        .cloned()
                        .collect(),
                )
            }
        }
    }

    /// Subscribe for live events only (spec §4.5 `subscribe`). Returns an
    /// unsubscribe-on-drop stream — there is no separate unsubscribe
    /// handle, matching the teacher's broadcast-receiver idiom.
    pub fn subscribe(&self, session_key: &str) -> BroadcastStream<StreamEvent> {
        let entry = self
            .sessions
            .entry(session_key.to_string())
            .or_insert_with(|| Mutex::new(SessionStream::new()));
        let stream = entry.lock().unwrap();
        BroadcastStream::new(stream.tx.subscribe())
    }

    /// Reconnect with a cursor (spec §4.5 "Cursor-based reconnect"): the
    /// receiver is created *before* the catch-up batch is read out from
    /// the same lock, so nothing published between the two can be
    /// skipped or duplicated across the handoff boundary.
    pub fn subscribe_from(
        &self,
        session_key: &str,
        since_cursor: Option<u64>,
    ) -> (Replay, BroadcastStream<StreamEvent>) {
        let entry = self
            .sessions
            .entry(session_key.to_string())
            .or_insert_with(|| Mutex::new(SessionStream::new()));
        let stream = entry.lock().unwrap();
        let receiver = BroadcastStream::new(stream.tx.subscribe());
        let replay = self.replay_locked(&stream, since_cursor);
        (replay, receiver)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[test]
    fn event_ids_strictly_increase_within_a_session() {
        let bus = EventBus::new();
        let a = bus.publish("s1", "output_delta", None, serde_json::json!({}));
        let b = bus.publish("s1", "output_delta", None, serde_json::json!({}));
        assert!(b.event_id > a.event_id);
    }

    #[test]
    fn sessions_have_independent_cursors() {
        let bus = EventBus::new();
        bus.publish("s1", "output_delta", None, serde_json::json!({}));
        let first_s2 = bus.publish("s2", "output_delta", None, serde_json::json!({}));
        assert_eq!(first_s2.event_id, 1);
    }

    #[test]
    fn replay_from_cursor_excludes_already_seen_events() {
        let bus = EventBus::new();
        bus.publish("s1", "tool_start", None, serde_json::json!({}));
        let second = bus.publish("s1", "tool_end", None, serde_json::json!({}));
        let Replay::Events(events) = bus.replay_from("s1", Some(second.event_id - 1)) else {
            panic!("expected Events");
        };
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, second.event_id);
    }

    #[test]
    fn replay_beyond_retention_is_truncated() {
        let bus = EventBus::with_retention(2);
        bus.publish("s1", "output_delta", None, serde_json::json!({}));
        bus.publish("s1", "output_delta", None, serde_json::json!({}));
        bus.publish("s1", "output_delta", None, serde_json::json!({}));
        match bus.replay_from("s1", Some(0)) {
            Replay::Truncated => {}
            Replay::Events(_) => panic!("expected truncation"),
        }
    }

    #[tokio::test]
    async fn subscribe_from_handoff_has_no_gap_or_duplicate() {
        let bus = EventBus::new();
        let first = bus.publish("s1", "tool_start", None, serde_json::json!({}));
        let (replay, mut rx) = bus.subscribe_from("s1", Some(first.event_id));
        let Replay::Events(catch_up) = replay else {
            panic!("expected Events");
        };
        assert!(catch_up.is_empty());

        let live = bus.publish("s1", "tool_end", None, serde_json::json!({}));
        let observed = rx.next().await.unwrap().unwrap();
        assert_eq!(observed.event_id, live.event_id);
    }
}
