// HTTP and WebSocket APIs

mod chat;
mod error;
mod ingestion;
pub mod query;
pub mod websocket;

pub use chat::{create_chat_router, ChatAppState};
pub use error::AppError;
pub use ingestion::{create_router, AppState};
pub use query::{create_query_router, HealthResponse, QueryAppState};
pub use websocket::{create_ws_router, ws_handler, WsAppState};

use crate::chat::ChatDispatcher;
use crate::state::StateEngine;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Assemble every route with permissive CORS
pub fn create_app(state_engine: Arc<StateEngine>, dispatcher: Arc<ChatDispatcher>) -> Router {
    Router::new()
        .merge(create_router(AppState {
            state_engine: Arc::clone(&state_engine),
        }))
        .merge(create_chat_router(Arc::new(ChatAppState { dispatcher })))
        .merge(create_query_router(Arc::new(QueryAppState {
            state_engine: Arc::clone(&state_engine),
        })))
        .merge(create_ws_router(Arc::new(WsAppState { state_engine })))
        .layer(CorsLayer::permissive())
}
