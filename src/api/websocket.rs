use crate::state::StateEngine;
use crate::subscription::ConnectionManager;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state for WebSocket handler
#[derive(Clone)]
pub struct WsAppState {
    pub state_engine: Arc<StateEngine>,
}

/// GET /ws - WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsAppState>>) -> Response {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Create WebSocket router
pub fn create_ws_router(state: Arc<WsAppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Handle WebSocket connection: join (snapshot), then stream
async fn handle_socket(socket: WebSocket, state: Arc<WsAppState>) {
    let observer = match state.state_engine.join().await {
        Ok(observer) => observer,
        Err(e) => {
            error!(error = %e, "Failed to build init snapshot");
            return;
        }
    };

    ConnectionManager::new(observer, Arc::clone(state.state_engine.hub()))
        .handle(socket)
        .await;
}
