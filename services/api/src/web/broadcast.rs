//! services/api/src/web/broadcast.rs
//!
//! Best-effort fan-out of server events to every connected WebSocket observer.
//!
//! A `tokio::sync::broadcast` channel carries pre-serialized event JSON. Each
//! connection subscribes on upgrade and unsubscribes by dropping its receiver;
//! observers that fall behind simply miss events (no queueing beyond the channel
//! buffer, no replay, no delivery guarantee).

use crate::web::protocol::ServerEvent;
use tokio::sync::broadcast;
use tracing::{debug, error};

/// Buffered events per subscriber before lagging receivers start skipping.
const EVENT_BUFFER: usize = 256;

/// Shared handle for broadcasting events to all current observers.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<String>,
}

impl Broadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    /// Registers a new observer. Dropping the receiver deregisters it.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Serializes the event once and pushes it to every open observer.
    /// Having no observers is not an error.
    pub fn broadcast(&self, event: &ServerEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize server event: {}", e);
                return;
            }
        };
        match self.tx.send(json) {
            Ok(receivers) => debug!("Broadcast event to {} observer(s)", receivers),
            Err(_) => debug!("Broadcast event dropped: no connected observers"),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
