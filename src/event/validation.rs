use super::InboundEvent;
use thiserror::Error;

/// Ingress validation failures. These are the only hard errors callers see.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing type or agent")]
    MissingTypeOrAgent,
    #[error("Missing agent")]
    MissingAgent,
    #[error("Missing message")]
    MissingMessage,
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

/// Validates the envelope of a single submitted event.
///
/// Only presence is checked here: `type` and `agent` must be non-empty.
/// Whether the type is recognized and the agent is known is decided by
/// the state engine.
pub fn validate(event: &InboundEvent) -> Result<(), ValidationError> {
    if event.event_type.is_empty() || event.agent.is_empty() {
        return Err(ValidationError::MissingTypeOrAgent);
    }
    Ok(())
}
