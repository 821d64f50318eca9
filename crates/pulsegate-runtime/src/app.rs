//! Composition root: the admin HTTP surface every standalone deployment
//! exposes alongside the pub/sub RPC surface (spec §6 "there is no
//! standalone CLI within the core"), following the shape of
//! `skynet_gateway::app::AppState` / `build_router`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use pulsegate_channels::ChannelManager;
use pulsegate_eventbus::EventBus;
use pulsegate_whatsapp::WhatsAppChannel;

pub struct AppState {
    pub channels: Arc<tokio::sync::RwLock<ChannelManager>>,
    pub whatsapp: Option<Arc<WhatsAppChannel>>,
    pub events: Arc<EventBus>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(crate::http::health_handler))
        .route("/webhooks/whatsapp", post(crate::http::whatsapp_webhook_handler))
        .route("/sessions/{session_key}/stream", get(crate::ws::stream_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
