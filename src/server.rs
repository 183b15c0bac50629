// src/server.rs

use crate::store::ResultStore;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

/// Shared state for the HTTP handlers: the result store injected at
/// construction time, plus the push-channel cadence.
#[derive(Clone)]
pub struct AppState {
    pub store: ResultStore,
    pub push_interval: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/results", get(get_results))
        .route("/health", get(health))
        .route("/ws/results", get(ws_results))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Polling endpoint: always the last successfully computed snapshot.
async fn get_results(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.read().await)
}

/// Constant-time liveness signal, independent of pipeline state.
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn ws_results(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| push_results(socket, state))
}

/// Push channel: send the current snapshot at a fixed interval until the
/// consumer disconnects. The store guard is released before each send, so
/// it is never held across a network write.
async fn push_results(mut socket: WebSocket, state: AppState) {
    loop {
        let snapshot = state.store.read().await;

        let payload = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize result snapshot: {}", e);
                break;
            }
        };

        if socket.send(Message::Text(payload.into())).await.is_err() {
            debug!("WebSocket client disconnected");
            break;
        }

        tokio::time::sleep(state.push_interval).await;
    }
}
