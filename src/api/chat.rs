use crate::api::error::AppError;
use crate::chat::{ChatDispatcher, ChatResponse};
use crate::event::ValidationError;
use axum::{body::Bytes, extract::State, response::Json, routing::post, Router};
use serde::Deserialize;
use std::sync::Arc;

/// Shared state for chat API
pub struct ChatAppState {
    pub dispatcher: Arc<ChatDispatcher>,
}

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

/// Create chat API router
pub fn create_chat_router(state: Arc<ChatAppState>) -> Router {
    Router::new()
        .route("/send", post(send_message))
        .with_state(state)
}

/// POST /send - Relay a chat message to the assistant
///
/// Only a missing message is an error; dependency failures come back as a
/// fallback response marked `test: true`.
async fn send_message(
    State(state): State<Arc<ChatAppState>>,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|e| ValidationError::InvalidBody(e.to_string()))?;

    if request.message.is_empty() {
        return Err(ValidationError::MissingMessage.into());
    }

    Ok(Json(state.dispatcher.dispatch(&request.message).await))
}
