use crate::event::ValidationError;
use crate::state::ProcessError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Malformed or incomplete request
    Validation(ValidationError),
    /// Well-formed request the state engine refused
    Rejected(ProcessError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Rejected(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e)
    }
}

impl From<ProcessError> for AppError {
    fn from(e: ProcessError) -> Self {
        AppError::Rejected(e)
    }
}

/// Success body for ingestion endpoints
#[derive(Serialize)]
pub(crate) struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub(crate) fn ok() -> Json<Self> {
        Json(Self { ok: true })
    }
}
