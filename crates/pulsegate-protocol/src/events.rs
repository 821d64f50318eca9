//! Named event types (spec §3 session events, §4.5 pipeline events).
//! Plain string constants, not an enum — events cross a wire boundary
//! (the durable stream) and new event types must round-trip even when a
//! consumer built against an older version of this crate doesn't know
//! about them yet, matching `skynet-protocol::methods`' "well-known
//! string constants" approach rather than a closed enum.

/// Session event types (spec §3 `Session` "Event types").
pub const OUTPUT_DELTA: &str = "output_delta";
pub const THINKING_DELTA: &str = "thinking_delta";
pub const TOOL_START: &str = "tool_start";
pub const TOOL_END: &str = "tool_end";
pub const STEP_END: &str = "step_end";
pub const TURN_END: &str = "turn_end";
pub const SESSION_COMPLETE: &str = "session_complete";
pub const RESPONSE_ABORTED: &str = "response_aborted";
pub const SESSION_STATUS: &str = "session_status";
pub const SESSION_ERROR: &str = "session_error";
pub const CONTAINER_READY: &str = "container_ready";
pub const USER_MESSAGE_UPDATE: &str = "user_message_update";
pub const TTS_AUDIO: &str = "tts_audio";

/// Pipeline event types (spec §4.5).
pub const PIPELINE_QUEUED: &str = "PIPELINE_QUEUED";
pub const PIPELINE_STARTED: &str = "PIPELINE_STARTED";
pub const PIPELINE_OUTPUT: &str = "PIPELINE_OUTPUT";
pub const PIPELINE_TOOL_CALL_START: &str = "PIPELINE_TOOL_CALL_START";
pub const PIPELINE_TOOL_CALL_END: &str = "PIPELINE_TOOL_CALL_END";
pub const PIPELINE_STEP_COMPLETE: &str = "PIPELINE_STEP_COMPLETE";
pub const PIPELINE_STEP_FAILED: &str = "PIPELINE_STEP_FAILED";
pub const PIPELINE_RUN_COMPLETE: &str = "PIPELINE_RUN_COMPLETE";
pub const PIPELINE_RUN_FAILED: &str = "PIPELINE_RUN_FAILED";
pub const PIPELINE_FILE_CHANGED: &str = "PIPELINE_FILE_CHANGED";
pub const PIPELINE_COMMIT_FAILED: &str = "PIPELINE_COMMIT_FAILED";

/// All session event type constants, for validation / exhaustiveness
/// tests — not used on any hot path.
pub const SESSION_EVENT_TYPES: &[&str] = &[
    OUTPUT_DELTA,
    THINKING_DELTA,
    TOOL_START,
    TOOL_END,
    STEP_END,
    TURN_END,
    SESSION_COMPLETE,
    RESPONSE_ABORTED,
    SESSION_STATUS,
    SESSION_ERROR,
    CONTAINER_READY,
    USER_MESSAGE_UPDATE,
    TTS_AUDIO,
];

pub const PIPELINE_EVENT_TYPES: &[&str] = &[
    PIPELINE_QUEUED,
    PIPELINE_STARTED,
    PIPELINE_OUTPUT,
    PIPELINE_TOOL_CALL_START,
    PIPELINE_TOOL_CALL_END,
    PIPELINE_STEP_COMPLETE,
    PIPELINE_STEP_FAILED,
    PIPELINE_RUN_COMPLETE,
    PIPELINE_RUN_FAILED,
    PIPELINE_FILE_CHANGED,
    PIPELINE_COMMIT_FAILED,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_unique() {
        let mut all: Vec<&str> = SESSION_EVENT_TYPES.iter().chain(PIPELINE_EVENT_TYPES).copied().collect();
        let before = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), before);
    }
}
