//! WebSocket endpoint exposing the Session Streamer + Client Stream State
//! Machine (spec §4.5-4.7) over the durable event bus, the surface a
//! dashboard or channel transcript view subscribes to. Grounded in
//! `skynet_gateway::ws::connection::ws_handler`'s split-socket,
//! `select!`-loop shape.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::extract::{ws::Message, ws::WebSocket, Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use pulsegate_client_stream::{ClientStreamObserver, ClientStreamState};
use pulsegate_protocol::frames::StreamEvent;
use pulsegate_streamer::{ActiveBlock, SessionStreamer, StreamObserver, StructuralMessage};

use crate::app::AppState;

#[derive(Deserialize)]
pub struct StreamQuery {
    since: Option<u64>,
}

pub async fn stream_handler(
    ws: WebSocketUpgrade,
    Path(session_key): Path<String>,
    Query(query): Query<StreamQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_stream(socket, state, session_key, query.since))
}

/// Forwards the Session Streamer's structural transitions to the socket
/// as JSON text frames; built once per connection.
struct SocketStreamForwarder {
    tx: tokio::sync::mpsc::UnboundedSender<String>,
}

impl StreamObserver for SocketStreamForwarder {
    fn on_flush(&self, streaming_text: &str, streaming_thinking: &str, active_block: ActiveBlock) {
        let _ = self.tx.send(
            json!({
                "type": "flush",
                "text": streaming_text,
                "thinking": streaming_thinking,
                "active_block": format!("{active_block:?}"),
            })
            .to_string(),
        );
    }

    fn on_message_committed(&self, message: &StructuralMessage) {
        let _ = self.tx.send(
            json!({
                "type": "message",
                "id": message.id,
                "kind": format!("{:?}", message.kind),
                "text": message.text,
                "tool_call_id": message.tool_call_id,
                "tool_name": message.tool_name,
                "tool_result": message.tool_result,
                "tool_error": message.tool_error,
                "done": message.done,
            })
            .to_string(),
        );
    }

    fn on_turn_end(&self, success: bool) {
        let _ = self.tx.send(json!({"type": "turn_end", "success": success}).to_string());
    }
}

/// Feeds every reconciled bus event into the session's structural
/// assembler. The standalone runner keeps no separate durable transcript
/// store, so `history_loaded` is driven with an empty known-id set —
/// every replayed event not already redelivered by the broadcast handoff
/// is assembled and forwarded.
struct StreamerFeed {
    streamer: Mutex<SessionStreamer>,
}

impl ClientStreamObserver for StreamerFeed {
    fn on_event(&self, event: &StreamEvent) {
        let mut streamer = self.streamer.lock().unwrap();
        streamer.handle_event(event);
        streamer.flush();
    }

    fn on_replay_truncated(&self) {
        warn!("session stream replay truncated, client must resync from storage");
    }
}

async fn run_stream(socket: WebSocket, state: Arc<AppState>, session_key: String, since: Option<u64>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut out_rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    let forwarder = Arc::new(SocketStreamForwarder { tx });
    let feed = Arc::new(StreamerFeed {
        streamer: Mutex::new(SessionStreamer::new(session_key.clone(), forwarder)),
    });
    let mut client_state = ClientStreamState::new(feed);

    let (replay, mut live) = state.events.subscribe_from(&session_key, since);
    client_state.begin_replay(replay);
    client_state.history_loaded(&HashSet::new());

    let outbound = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            event = live.next() => {
                match event {
                    Some(Ok(event)) => client_state.ingest(event),
                    Some(Err(e)) => warn!(session_key = %session_key, error = %e, "stream lagged, dropping a gap"),
                    None => break,
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    outbound.abort();
}
