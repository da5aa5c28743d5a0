use crate::state::{Snapshot, StateEngine};
use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;

/// Shared state for query API
pub struct QueryAppState {
    pub state_engine: Arc<StateEngine>,
}

/// Health response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Connected observers
    pub clients: usize,
    pub agents: Vec<String>,
}

/// Create query API router
pub fn create_query_router(state: Arc<QueryAppState>) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/health", get(health))
        .with_state(state)
}

/// GET /state - Current registry and activity log (same shape as `init`)
async fn get_state(State(state): State<Arc<QueryAppState>>) -> Json<Snapshot> {
    Json(state.state_engine.snapshot().await)
}

/// GET /health
async fn health(State(state): State<Arc<QueryAppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        clients: state.state_engine.hub().observer_count(),
        agents: state.state_engine.agent_ids().to_vec(),
    })
}
