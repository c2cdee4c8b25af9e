//! Fan-out of catalog changes to connected WebSocket clients.
//!
//! Delivery is best-effort and at-most-once: there is no backlog, a client
//! that connects later gets an `INITIAL_DATA` snapshot instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};
use uuid::Uuid;

use mousedeck_core::PushMessage;

pub type ConnectionId = Uuid;

/// Connected push clients, keyed by connection id.
///
/// Created once at startup and cleared on shutdown. Each connection owns the
/// receiving half of an unbounded channel; broadcasting to a closed handle
/// prunes it instead of failing.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<Mutex<HashMap<ConnectionId, UnboundedSender<String>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, UnboundedSender<String>>> {
        match self.connections.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn register(&self) -> (ConnectionId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let id = Uuid::now_v7();
        self.lock().insert(id, tx);
        debug!(connection_id = %id, "push client registered");
        (id, rx)
    }

    pub fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!(connection_id = %id, "push client unregistered");
        }
        removed
    }

    /// Sends `message` to every live connection and returns how many received it.
    pub fn broadcast(&self, message: &PushMessage) -> usize {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!(kind = message.kind(), error = %e, "failed to encode push message");
                return 0;
            }
        };

        let mut connections = self.lock();
        connections.retain(|_, tx| tx.send(text.clone()).is_ok());
        debug!(kind = message.kind(), recipients = connections.len(), "broadcast");
        connections.len()
    }

    /// Drops every connection; their receivers observe end-of-stream.
    pub fn clear(&self) -> usize {
        let mut connections = self.lock();
        let count = connections.len();
        connections.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
