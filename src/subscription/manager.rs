use crate::subscription::hub::{BroadcastHub, Observer};
use axum::extract::ws::{Message, WebSocket};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Drives a single WebSocket observer: forwards hub frames to the socket
/// until either side goes away, then leaves the hub.
pub struct ConnectionManager {
    observer: Observer,
    hub: Arc<BroadcastHub>,
}

impl ConnectionManager {
    pub fn new(observer: Observer, hub: Arc<BroadcastHub>) -> Self {
        Self { observer, hub }
    }

    /// Handle WebSocket connection lifecycle
    pub async fn handle(mut self, mut socket: WebSocket) {
        let id = self.observer.id();
        info!(observer = %id, clients = self.hub.observer_count(), "Frontend connected");

        loop {
            tokio::select! {
                // Frames from the hub (init first, then events)
                frame = self.observer.recv() => {
                    match frame {
                        Some(frame) => {
                            if let Err(e) = socket.send(Message::Text(frame.to_string())).await {
                                warn!(observer = %id, error = %e, "Failed to deliver frame");
                                break;
                            }
                        }
                        None => {
                            warn!(observer = %id, "Observer dropped by hub");
                            break;
                        }
                    }
                }

                // Observers only talk to us to close or ping
                msg = socket.recv() => {
                    match msg {
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = socket.send(Message::Pong(data)).await {
                                error!(observer = %id, error = %e, "Failed to send pong");
                                break;
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(observer = %id, error = %e, "WebSocket error");
                            break;
                        }
                    }
                }
            }
        }

        self.hub.leave(id);
        info!(observer = %id, clients = self.hub.observer_count(), "Frontend disconnected");
    }
}
