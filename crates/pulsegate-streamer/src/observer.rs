use crate::types::{ActiveBlock, StructuralMessage};

/// Sink for Session Streamer notifications (spec §4.6). Structural
/// transitions notify synchronously; token deltas only set the dirty flag
/// and are delivered through `on_flush` on the next coalesced tick.
pub trait StreamObserver: Send + Sync {
    fn on_flush(&self, streaming_text: &str, streaming_thinking: &str, active_block: ActiveBlock) {
        let _ = (streaming_text, streaming_thinking, active_block);
    }

    fn on_message_committed(&self, message: &StructuralMessage) {
        let _ = message;
    }

    fn on_turn_end(&self, success: bool) {
        let _ = success;
    }
}

/// No-op observer, useful for tests and for sessions nobody is watching.
pub struct NullObserver;

impl StreamObserver for NullObserver {}
