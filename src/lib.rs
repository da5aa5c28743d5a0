// Event model and ingress validation
pub mod event;

// Agent registry, activity history and the state engine
pub mod state;

// HTTP and WebSocket APIs
pub mod api;

// Observer fan-out
pub mod subscription;

// Chat dispatch to the reply dependency
pub mod chat;

// Configuration
pub mod config;

pub use event::{EventKind, InboundEvent, OutboundEvent};
pub use state::StateEngine;
