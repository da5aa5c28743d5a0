use crate::event::OutboundEvent;
use crate::state::Snapshot;
use serde::Serialize;
use std::sync::Arc;

/// A serialized message, shared by every observer it is delivered to
pub type Frame = Arc<str>;

/// Server → Client: join-time snapshot
#[derive(Debug, Clone, Serialize)]
pub struct InitMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub data: Snapshot,
}

impl From<Snapshot> for InitMessage {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            msg_type: "init".to_string(),
            data: snapshot,
        }
    }
}

/// Server → Client message types.
///
/// Event frames carry the outbound event as-is: `{type, agent, data, timestamp}`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Init(InitMessage),
    Event(OutboundEvent),
}

impl ServerMessage {
    /// Serialize once into a frame that can be fanned out without copying
    pub fn encode(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::from)
    }
}
