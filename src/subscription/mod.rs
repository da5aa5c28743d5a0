// Observer fan-out and WebSocket delivery

pub mod hub;
pub mod manager;
pub mod protocol;

pub use hub::{BroadcastHub, Observer};
pub use manager::ConnectionManager;
pub use protocol::{Frame, InitMessage, ServerMessage};
