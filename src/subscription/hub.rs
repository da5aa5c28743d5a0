use crate::subscription::protocol::Frame;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Receiving end of one observer's queue.
///
/// The first frame is always the `init` snapshot handed over at join.
/// `recv` returns `None` once the hub has dropped this observer.
#[derive(Debug)]
pub struct Observer {
    id: Uuid,
    rx: mpsc::Receiver<Frame>,
}

impl Observer {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Next queued frame, if any, without waiting
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }
}

/// Fan-out to the set of connected observers.
///
/// Each observer owns a bounded queue. Delivery never blocks: an observer
/// whose queue is full or closed is removed from the set, which ends its
/// stream.
pub struct BroadcastHub {
    observers: DashMap<Uuid, mpsc::Sender<Frame>>,
    buffer: usize,
}

impl BroadcastHub {
    /// Create a hub whose observers buffer up to `buffer` frames (minimum 1)
    pub fn new(buffer: usize) -> Self {
        Self {
            observers: DashMap::new(),
            buffer: buffer.max(1),
        }
    }

    /// Add an observer, queueing `init` as its first frame.
    ///
    /// Callers must hold the state sequencer while joining so that `init`
    /// and the subsequent stream line up.
    pub fn join(&self, init: Frame) -> Observer {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();

        // Fresh channel with capacity >= 1: cannot be full or closed
        let _ = tx.try_send(init);
        self.observers.insert(id, tx);

        debug!(observer = %id, observers = self.observers.len(), "Observer joined");

        Observer { id, rx }
    }

    /// Deliver `frame` to every observer present at the time of the call.
    ///
    /// Returns the number of observers the frame was queued for. Failed
    /// observers are dropped; the failure never reaches the publisher.
    pub fn publish(&self, frame: Frame) -> usize {
        let targets: Vec<(Uuid, mpsc::Sender<Frame>)> = self
            .observers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        let mut failed = Vec::new();

        for (id, tx) in targets {
            match tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(observer = %id, "Observer queue full, dropping observer");
                    failed.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(observer = %id, "Observer gone, dropping");
                    failed.push(id);
                }
            }
        }

        for id in failed {
            self.observers.remove(&id);
        }

        delivered
    }

    /// Remove an observer. Idempotent; returns whether it was present.
    pub fn leave(&self, id: Uuid) -> bool {
        self.observers.remove(&id).is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(256)
    }
}
