//! Broadcast Gateway
//!
//! Maps connection ids to their outbound channels and delivers match events.
//! Delivery never waits: a full or closed channel drops that one message.

use std::collections::BTreeMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::game::events::Outbound;
use crate::game::state::ConnectionId;
use crate::network::protocol::ServerMessage;

/// Outbound channel registry.
#[derive(Debug, Default)]
pub struct BroadcastGateway {
    connections: RwLock<BTreeMap<ConnectionId, mpsc::Sender<ServerMessage>>>,
}

impl BroadcastGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection's outbound channel.
    pub async fn register(&self, connection: ConnectionId, sender: mpsc::Sender<ServerMessage>) {
        self.connections.write().await.insert(connection, sender);
    }

    /// Detach a connection. Later events addressed to it are dropped.
    pub async fn unregister(&self, connection: ConnectionId) {
        self.connections.write().await.remove(&connection);
    }

    /// Number of attached connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send one message to one connection. Returns false if it was dropped.
    pub async fn send_to(&self, connection: ConnectionId, message: ServerMessage) -> bool {
        let connections = self.connections.read().await;
        match connections.get(&connection) {
            Some(sender) => try_deliver(connection, sender, message),
            None => false,
        }
    }

    /// Deliver each event to exactly its recipients.
    pub async fn deliver(&self, outbound: Vec<Outbound>) {
        if outbound.is_empty() {
            return;
        }

        let connections = self.connections.read().await;
        for Outbound { recipients, event } in outbound {
            let message = ServerMessage::from(&event);
            for connection in recipients {
                match connections.get(&connection) {
                    Some(sender) => {
                        try_deliver(connection, sender, message.clone());
                    }
                    None => debug!(%connection, event = event.name(), "Recipient not attached"),
                }
            }
        }
    }
}

fn try_deliver(connection: ConnectionId, sender: &mpsc::Sender<ServerMessage>, message: ServerMessage) -> bool {
    match sender.try_send(message) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(%connection, "Outbound buffer full, dropping message");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(%connection, "Outbound channel closed");
            false
        }
    }
}
