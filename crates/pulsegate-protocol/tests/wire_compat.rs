//! Wire-compatibility tests, mirroring `skynet-protocol/tests/wire_compat.rs`:
//! these pin the exact JSON shape external channel providers and the
//! dashboard rely on, so a field rename here is caught at compile/test
//! time rather than silently breaking a consumer.

use pulsegate_protocol::frames::{RpcReply, RpcRequest, StreamEvent, WakePayload};

#[test]
fn rpc_request_wire_shape() {
    let req = RpcRequest {
        id: "req-1".into(),
        method: "send".into(),
        params: Some(serde_json::json!({"text": "hi"})),
    };
    let value = serde_json::to_value(&req).unwrap();
    assert_eq!(value["id"], "req-1");
    assert_eq!(value["method"], "send");
    assert_eq!(value["params"]["text"], "hi");
}

#[test]
fn rpc_reply_omits_null_fields() {
    let reply = RpcReply::ok("req-1", serde_json::json!({"ok": true}));
    let value = serde_json::to_value(&reply).unwrap();
    assert!(value.get("error").is_none());

    let err = RpcReply::err("req-2", "boom");
    let value = serde_json::to_value(&err).unwrap();
    assert!(value.get("payload").is_none());
    assert_eq!(value["error"], "boom");
}

#[test]
fn stream_event_wire_shape() {
    let ev = StreamEvent {
        event_id: 7,
        event_type: pulsegate_protocol::events::TURN_END.to_string(),
        timestamp: 1_700_000_000_000,
        tool_call_id: None,
        payload: serde_json::json!({"success": true}),
    };
    let value = serde_json::to_value(&ev).unwrap();
    assert_eq!(value["event_id"], 7);
    assert_eq!(value["event_type"], "turn_end");
    assert!(value.get("tool_call_id").is_none());
}

#[test]
fn wake_payload_optional_fields_round_trip() {
    let json = r#"{"from": "agent-b"}"#;
    let payload: WakePayload = serde_json::from_str(json).unwrap();
    assert_eq!(payload.from, "agent-b");
    assert!(payload.priority.is_none());
}
