use crate::api::error::{AppError, OkResponse};
use crate::event::{validate, InboundEvent, StatusReport, ValidationError};
use crate::state::StateEngine;
use axum::{body::Bytes, extract::State, response::Json, routing::post, Router};
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub state_engine: Arc<StateEngine>,
}

/// Create API router with ingestion endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/event", post(submit_event))
        .route("/status", post(submit_status))
        .with_state(Arc::new(state))
}

/// POST /event - Submit a single event
async fn submit_event(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<OkResponse>, AppError> {
    let event: InboundEvent = serde_json::from_slice(&body)
        .map_err(|e| ValidationError::InvalidBody(e.to_string()))?;

    validate(&event)?;

    info!(event_type = %event.event_type, agent = %event.agent, "Event");

    state.state_engine.process_event(event).await?;

    Ok(OkResponse::ok())
}

/// POST /status - Batched status report (heartbeat integration)
///
/// Applied as status, then thinking, then one action per `recentActions`
/// entry, exactly as if each had been submitted to POST /event in turn.
async fn submit_status(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<OkResponse>, AppError> {
    let report: StatusReport = serde_json::from_slice(&body)
        .map_err(|e| ValidationError::InvalidBody(e.to_string()))?;

    if report.agent.is_empty() {
        return Err(ValidationError::MissingAgent.into());
    }

    let agent = report.agent.clone();
    let events = report.into_events();

    info!(agent = %agent, events = events.len(), "Status report");

    state.state_engine.process_batch(&agent, events).await?;

    Ok(OkResponse::ok())
}
