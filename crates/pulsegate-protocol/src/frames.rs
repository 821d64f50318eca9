use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry on a session's durable append-only event stream (spec §4.5,
/// §9 "monotonic event ids"). `cursor` is the opaque, monotonically
/// increasing replay position within the session (spec §4.5 `replayFrom`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Strictly increasing within a session (spec §3 `eventId`).
    pub event_id: u64,
    pub event_type: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub payload: Value,
}

impl StreamEvent {
    /// The cursor supplied to `replayFrom`/reconnect is just the event id —
    /// the stream's entry id doubles as the cursor (spec §4.5).
    pub fn cursor(&self) -> u64 {
        self.event_id
    }
}

/// RPC request published to a channel's `{channel}:rpc:request` subject
/// (spec §4.8, §6). Wire shape mirrors `skynet-protocol::frames::ReqFrame`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// RPC reply published to `{channel}:rpc:reply:{id}` (spec §4.8, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReply {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcReply {
    pub fn ok(id: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            id: id.into(),
            ok: true,
            payload: Some(serde_json::to_value(payload).unwrap_or(Value::Null)),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ok: false,
            payload: None,
            error: Some(message.into()),
        }
    }
}

/// Credential hot-reload notification payload (spec §4.8, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsChanged {
    pub agent_id: String,
    pub channel: String,
    #[serde(default)]
    pub removed: bool,
}

/// Wake notification payload (spec §4.4 "The payload carries …").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakePayload {
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_reply_ok_round_trips() {
        let reply = RpcReply::ok("req-1", serde_json::json!({"status": "ok"}));
        let json = serde_json::to_string(&reply).unwrap();
        let parsed: RpcReply = serde_json::from_str(&json).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.id, "req-1");
    }

    #[test]
    fn stream_event_cursor_is_event_id() {
        let ev = StreamEvent {
            event_id: 42,
            event_type: "turn_end".into(),
            timestamp: 0,
            tool_call_id: None,
            payload: Value::Null,
        };
        assert_eq!(ev.cursor(), 42);
    }
}
