//! Admin HTTP handlers: a liveness probe plus the WhatsApp Cloud API
//! webhook ingress (the one channel that is push-delivered over HTTP
//! rather than a socket/long-poll the adapter owns directly, spec §4.8).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::app::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let statuses = state.channels.read().await.statuses();
    let channels: Vec<Value> = statuses
        .into_iter()
        .map(|(name, status)| json!({"channel": name, "status": format!("{status:?}")}))
        .collect();
    Json(json!({"status": "ok", "channels": channels}))
}

pub async fn whatsapp_webhook_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let Some(whatsapp) = &state.whatsapp else {
        return Err((StatusCode::NOT_FOUND, Json(json!({"error": "whatsapp channel not configured"}))));
    };
    whatsapp.handle_webhook(&payload).await.map_err(|e| {
        warn!(error = %e, "whatsapp webhook processing failed");
        (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()})))
    })?;
    Ok(StatusCode::OK)
}
