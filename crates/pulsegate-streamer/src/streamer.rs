use std::collections::HashMap;
use std::sync::Arc;

use pulsegate_protocol::events;
use pulsegate_protocol::frames::StreamEvent as WireEvent;
use tracing::{debug, warn};

use crate::observer::StreamObserver;
use crate::types::{ActiveBlock, MessageKind, StructuralMessage};

/// Per-session event assembler (spec §4.6). Event processing within one
/// session is serialised in order by the caller; this type is not
/// internally synchronised.
pub struct SessionStreamer {
    session_id: String,
    streaming_text: String,
    streaming_thinking: String,
    active_block: ActiveBlock,
    inflight_tools: HashMap<String, String>,
    messages: Vec<StructuralMessage>,
    aborted: bool,
    dirty: bool,
    next_message_id: u64,
    observer: Arc<dyn StreamObserver>,
}

impl SessionStreamer {
    pub fn new(session_id: impl Into<String>, observer: Arc<dyn StreamObserver>) -> Self {
        Self {
            session_id: session_id.into(),
            streaming_text: String::new(),
            streaming_thinking: String::new(),
            active_block: ActiveBlock::None,
            inflight_tools: HashMap::new(),
            messages: Vec::new(),
            aborted: false,
            dirty: false,
            next_message_id: 0,
            observer,
        }
    }

    pub fn messages(&self) -> &[StructuralMessage] {
        &self.messages
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Drives the "animation-frame-style coalesced flush": called once per
    /// render tick by the caller. No-op, and clears the dirty flag, if
    /// nothing accumulated since the last flush.
    pub fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        self.observer.on_flush(&self.streaming_text, &self.streaming_thinking, self.active_block);
        self.dirty = false;
    }

    pub fn handle_event(&mut self, event: &WireEvent) {
        match event.event_type.as_str() {
            events::THINKING_DELTA => self.handle_delta(event, true),
            events::OUTPUT_DELTA => self.handle_delta(event, false),
            events::TOOL_START => self.handle_tool_start(event),
            events::TOOL_END => self.handle_tool_end(event),
            events::STEP_END => self.handle_step_end(event),
            events::TURN_END => self.handle_turn_end(event),
            events::RESPONSE_ABORTED => self.handle_response_aborted(),
            other => debug!(session_id = %self.session_id, event_type = other, "streamer: event type has no transition"),
        }
    }

    fn next_id(&mut self) -> String {
        self.next_message_id += 1;
        format!("{}-{}", self.session_id, self.next_message_id)
    }

    fn handle_delta(&mut self, event: &WireEvent, thinking: bool) {
        let wanted = if thinking { ActiveBlock::Thinking } else { ActiveBlock::Output };
        if self.active_block != wanted {
            self.commit_open_block();
            self.active_block = wanted;
        }
        let delta = event.payload.get("delta").and_then(|v| v.as_str()).unwrap_or_default();
        if thinking {
            self.streaming_thinking.push_str(delta);
        } else {
            self.streaming_text.push_str(delta);
        }
        self.dirty = true;
    }

    /// Converts the current accumulator, if any, into a committed
    /// structural message and resets it.
    fn commit_open_block(&mut self) {
        let (kind, text) = match self.active_block {
            ActiveBlock::None => return,
            ActiveBlock::Thinking => (MessageKind::Thinking, std::mem::take(&mut self.streaming_thinking)),
            ActiveBlock::Output => (MessageKind::Output, std::mem::take(&mut self.streaming_text)),
        };
        self.active_block = ActiveBlock::None;
        let id = self.next_id();
        self.messages.push(StructuralMessage::text(id, kind, text, true));
        self.notify_committed_last();
    }

    fn notify_committed_last(&self) {
        if let Some(last) = self.messages.last() {
            self.observer.on_message_committed(last);
        }
    }

    fn handle_tool_start(&mut self, event: &WireEvent) {
        self.commit_open_block();
        let tool_call_id = event.tool_call_id.clone().unwrap_or_else(|| self.next_id());
        let name = event.payload.get("name").and_then(|v| v.as_str()).map(str::to_string);
        let message_id = self.next_id();
        self.inflight_tools.insert(tool_call_id.clone(), message_id.clone());
        self.messages.push(StructuralMessage::tool_call(message_id, tool_call_id, name));
        self.notify_committed_last();
    }

    fn handle_tool_end(&mut self, event: &WireEvent) {
        let message_id = match &event.tool_call_id {
            Some(cid) => self.inflight_tools.remove(cid),
            None => None,
        };
        let target_id = message_id.or_else(|| {
            self.messages
                .iter()
                .rev()
                .find(|m| m.kind == MessageKind::ToolCall && !m.done)
                .map(|m| m.id.clone())
        });
        let Some(target_id) = target_id else {
            warn!(session_id = %self.session_id, "tool_end with no matching in-flight tool call, ignoring");
            return;
        };
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == target_id) {
            msg.tool_result = event.payload.get("result").cloned();
            msg.tool_error = event.payload.get("error").and_then(|v| v.as_str()).map(str::to_string);
            msg.tool_duration_ms = event.payload.get("duration_ms").and_then(|v| v.as_u64());
            msg.done = true;
        }
        self.inflight_tools.retain(|_, v| v != &target_id);
        self.notify_committed_last_by_id(&target_id);
    }

    fn notify_committed_last_by_id(&self, id: &str) {
        if let Some(msg) = self.messages.iter().find(|m| m.id == id) {
            self.observer.on_message_committed(msg);
        }
    }

    fn handle_step_end(&mut self, event: &WireEvent) {
        let success = event.payload.get("success").and_then(|v| v.as_bool()).unwrap_or(true);
        if success {
            return;
        }
        self.commit_open_block();
        let message = event.payload.get("message").and_then(|v| v.as_str()).unwrap_or("step failed");
        let id = self.next_id();
        self.messages.push(StructuralMessage::text(id, MessageKind::Error, message, true));
        self.notify_committed_last();
    }

    fn handle_turn_end(&mut self, event: &WireEvent) {
        if self.aborted {
            self.aborted = false;
            return;
        }
        self.commit_open_block();
        for msg in self.messages.iter_mut() {
            if !msg.done {
                msg.done = true;
            }
        }
        self.inflight_tools.clear();
        let success = event.payload.get("success").and_then(|v| v.as_bool()).unwrap_or(true);
        self.observer.on_turn_end(success);
    }

    fn handle_response_aborted(&mut self) {
        self.aborted = true;
        self.commit_open_block();
        if let Some(last_output) = self.messages.iter_mut().rev().find(|m| m.kind == MessageKind::Output) {
            last_output.text.push_str("[stopped]");
            last_output.done = true;
        } else {
            let id = self.next_id();
            self.messages.push(StructuralMessage::text(id, MessageKind::System, "Response stopped", true));
        }
        self.notify_committed_last();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        turn_ends: Mutex<Vec<bool>>,
        committed: Mutex<Vec<String>>,
    }

    impl StreamObserver for RecordingObserver {
        fn on_message_committed(&self, message: &StructuralMessage) {
            self.committed.lock().unwrap().push(message.id.clone());
        }

        fn on_turn_end(&self, success: bool) {
            self.turn_ends.lock().unwrap().push(success);
        }
    }

    fn event(event_type: &str, tool_call_id: Option<&str>, payload: serde_json::Value) -> WireEvent {
        WireEvent {
            event_id: 0,
            event_type: event_type.to_string(),
            timestamp: 0,
            tool_call_id: tool_call_id.map(str::to_string),
            payload,
        }
    }

    #[test]
    fn output_delta_then_turn_end_commits_one_message() {
        let observer = Arc::new(RecordingObserver::default());
        let mut streamer = SessionStreamer::new("s1", observer.clone());
        streamer.handle_event(&event(events::OUTPUT_DELTA, None, json!({"delta": "hello "})));
        streamer.handle_event(&event(events::OUTPUT_DELTA, None, json!({"delta": "world"})));
        assert!(streamer.is_dirty());
        streamer.handle_event(&event(events::TURN_END, None, json!({"success": true})));
        assert_eq!(streamer.messages().len(), 1);
        assert_eq!(streamer.messages()[0].text, "hello world");
        assert_eq!(observer.turn_ends.lock().unwrap().as_slice(), &[true]);
    }

    #[test]
    fn switching_block_kind_commits_the_previous_one() {
        let observer = Arc::new(RecordingObserver::default());
        let mut streamer = SessionStreamer::new("s1", observer);
        streamer.handle_event(&event(events::THINKING_DELTA, None, json!({"delta": "pondering"})));
        streamer.handle_event(&event(events::OUTPUT_DELTA, None, json!({"delta": "answer"})));
        assert_eq!(streamer.messages().len(), 1);
        assert_eq!(streamer.messages()[0].kind, MessageKind::Thinking);
        assert_eq!(streamer.messages()[0].text, "pondering");
    }

    #[test]
    fn tool_end_matches_by_id_then_falls_back_to_most_recent_open() {
        let observer = Arc::new(RecordingObserver::default());
        let mut streamer = SessionStreamer::new("s1", observer);
        streamer.handle_event(&event(events::TOOL_START, Some("call-1"), json!({"name": "search"})));
        streamer.handle_event(&event(events::TOOL_END, Some("call-1"), json!({"result": "ok"})));
        assert!(streamer.messages()[0].done);
        assert_eq!(streamer.messages()[0].tool_result, Some(json!("ok")));

        streamer.handle_event(&event(events::TOOL_START, None, json!({"name": "unnamed"})));
        streamer.handle_event(&event(events::TOOL_END, None, json!({"result": "fallback"})));
        assert!(streamer.messages()[1].done);
    }

    #[test]
    fn abort_then_turn_end_appends_stopped_once_and_suppresses_side_effects() {
        let observer = Arc::new(RecordingObserver::default());
        let mut streamer = SessionStreamer::new("s1", observer.clone());
        streamer.handle_event(&event(events::OUTPUT_DELTA, None, json!({"delta": "partial"})));
        streamer.handle_event(&event(events::RESPONSE_ABORTED, None, json!({})));
        streamer.handle_event(&event(events::TURN_END, None, json!({"success": true})));

        assert_eq!(streamer.messages().len(), 1);
        assert_eq!(streamer.messages()[0].text, "partial[stopped]");
        assert!(observer.turn_ends.lock().unwrap().is_empty());

        // A later turn resumes normal behaviour.
        streamer.handle_event(&event(events::OUTPUT_DELTA, None, json!({"delta": "next"})));
        streamer.handle_event(&event(events::TURN_END, None, json!({"success": true})));
        assert_eq!(observer.turn_ends.lock().unwrap().as_slice(), &[true]);
    }

    #[test]
    fn turn_end_commits_all_open_placeholders_not_just_the_latest() {
        let observer = Arc::new(RecordingObserver::default());
        let mut streamer = SessionStreamer::new("s1", observer);
        streamer.handle_event(&event(events::TOOL_START, Some("call-1"), json!({"name": "a"})));
        streamer.handle_event(&event(events::OUTPUT_DELTA, None, json!({"delta": "reply"})));
        streamer.handle_event(&event(events::TURN_END, None, json!({"success": true})));
        assert!(streamer.messages().iter().all(|m| m.done));
    }
}
