use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use pulsegate_eventbus::bus::Replay;
use pulsegate_protocol::frames::StreamEvent;
use tracing::debug;

use crate::observer::ClientStreamObserver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    LoadingHistory,
    Live,
}

/// Two-stage bootstrap that prevents duplication on reconnect (spec
/// §4.7). Construct one per consumer session; feed it every bus event as
/// it arrives, call `begin_replay` with the catch-up batch, then
/// `history_loaded` once durable history has finished loading.
pub struct ClientStreamState {
    phase: Phase,
    queue: VecDeque<StreamEvent>,
    replay_range: Option<(u64, u64)>,
    cursor: Option<u64>,
    observer: Arc<dyn ClientStreamObserver>,
}

impl ClientStreamState {
    pub fn new(observer: Arc<dyn ClientStreamObserver>) -> Self {
        Self {
            phase: Phase::LoadingHistory,
            queue: VecDeque::new(),
            replay_range: None,
            cursor: None,
            observer,
        }
    }

    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Record the bus's catch-up batch from `subscribe_from`. A
    /// `Replay::Truncated` result means the requested cursor fell outside
    /// retention; the consumer must re-sync from storage rather than
    /// trust this queue at all.
    pub fn begin_replay(&mut self, replay: Replay) {
        match replay {
            Replay::Events(events) => {
                if let (Some(first), Some(last)) = (events.first(), events.last()) {
                    self.replay_range = Some((first.event_id, last.event_id));
                }
                self.queue.extend(events);
            }
            Replay::Truncated => {
                self.observer.on_replay_truncated();
            }
        }
    }

    /// Feed one bus event (catch-up or live). While history is still
    /// loading, events are queued rather than delivered (spec §4.7 step
    /// 1).
    pub fn ingest(&mut self, event: StreamEvent) {
        match self.phase {
            Phase::LoadingHistory => self.queue.push_back(event),
            Phase::Live => self.deliver(event),
        }
    }

    /// Drain the queue against the durably-loaded message ids (spec §4.7
    /// step 2): an event already represented by a loaded durable message
    /// is dropped if it also falls within the replay range; everything
    /// else — including any genuinely live event with no replay range
    /// match — is delivered. The cursor always advances.
    pub fn history_loaded(&mut self, db_message_ids: &HashSet<String>) {
        let queued: Vec<StreamEvent> = self.queue.drain(..).collect();
        for event in queued {
            self.advance_cursor(event.event_id);

            let within_replay = self
                .replay_range
                .map(|(lo, hi)| event.event_id >= lo && event.event_id <= hi)
                .unwrap_or(false);
            let already_durable = event
                .payload
                .get("message_id")
                .and_then(|v| v.as_str())
                .map(|id| db_message_ids.contains(id))
                .unwrap_or(false);

            if within_replay && already_durable {
                debug!(event_id = event.event_id, "client stream: dropping duplicate of durable history");
                continue;
            }
            self.observer.on_event(&event);
        }
        self.phase = Phase::Live;
    }

    fn deliver(&mut self, event: StreamEvent) {
        self.advance_cursor(event.event_id);
        self.observer.on_event(&event);
    }

    fn advance_cursor(&mut self, event_id: u64) {
        self.cursor = Some(self.cursor.map_or(event_id, |c| c.max(event_id)));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        delivered: Mutex<Vec<u64>>,
        truncated: Mutex<bool>,
    }

    impl ClientStreamObserver for RecordingObserver {
        fn on_event(&self, event: &StreamEvent) {
            self.delivered.lock().unwrap().push(event.event_id);
        }

        fn on_replay_truncated(&self) {
            *self.truncated.lock().unwrap() = true;
        }
    }

    fn event(id: u64, message_id: Option<&str>) -> StreamEvent {
        StreamEvent {
            event_id: id,
            event_type: "turn_end".into(),
            timestamp: 0,
            tool_call_id: None,
            payload: match message_id {
                Some(m) => json!({"message_id": m}),
                None => json!({}),
            },
        }
    }

    #[test]
    fn queued_event_already_in_history_is_dropped() {
        let observer = Arc::new(RecordingObserver::default());
        let mut state = ClientStreamState::new(observer.clone());
        state.begin_replay(Replay::Events(vec![event(1, Some("m1")), event(2, Some("m2"))]));
        state.ingest(event(1, Some("m1")));
        state.ingest(event(2, Some("m2")));

        let mut known = HashSet::new();
        known.insert("m1".to_string());
        known.insert("m2".to_string());
        state.history_loaded(&known);

        assert!(observer.delivered.lock().unwrap().is_empty());
        assert_eq!(state.cursor(), Some(2));
    }

    #[test]
    fn queued_event_not_yet_in_history_is_delivered() {
        let observer = Arc::new(RecordingObserver::default());
        let mut state = ClientStreamState::new(observer.clone());
        state.begin_replay(Replay::Events(vec![event(1, Some("m1"))]));
        state.ingest(event(1, Some("m1")));
        // Arrives while loading but db snapshot predates it.
        state.ingest(event(2, Some("m2")));

        let mut known = HashSet::new();
        known.insert("m1".to_string());
        state.history_loaded(&known);

        assert_eq!(observer.delivered.lock().unwrap().as_slice(), &[2]);
    }

    #[test]
    fn events_after_history_loaded_deliver_immediately() {
        let observer = Arc::new(RecordingObserver::default());
        let mut state = ClientStreamState::new(observer.clone());
        state.begin_replay(Replay::Events(vec![]));
        state.history_loaded(&HashSet::new());
        state.ingest(event(5, None));
        assert_eq!(observer.delivered.lock().unwrap().as_slice(), &[5]);
    }

    #[test]
    fn truncated_replay_notifies_observer() {
        let observer = Arc::new(RecordingObserver::default());
        let mut state = ClientStreamState::new(observer.clone());
        state.begin_replay(Replay::Truncated);
        assert!(*observer.truncated.lock().unwrap());
    }
}
