//! WebSocket connection manager.
//!
//! Tracks all active WebSocket connections by their connection handle and
//! queues outbound events for each connection's writer task.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tracing::warn;

use crate::server::metrics;
use crate::signaling::{ConnectionId, Delivery, ServerEvent};

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 32;

/// Error type for send operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SendError {
    /// The target connection is not known.
    #[error("Connection not found")]
    NotConnected,
    /// The connection's writer has gone away.
    #[error("Connection closed")]
    Disconnected,
    /// The connection's outbound queue is full.
    #[error("Outbound queue full")]
    Full,
}

impl SendError {
    fn metric_label(&self) -> &'static str {
        match self {
            SendError::NotConnected => "not_connected",
            SendError::Disconnected => "disconnected",
            SendError::Full => "full",
        }
    }
}

/// Manages all active WebSocket connections.
pub struct ConnectionManager {
    /// connection id -> outbound sender
    connections: RwLock<HashMap<ConnectionId, mpsc::Sender<ServerEvent>>>,
    buffer: usize,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOUND_BUFFER)
    }
}

impl ConnectionManager {
    /// Create a new connection manager whose per-connection queues hold
    /// `buffer` events.
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Register a new connection.
    ///
    /// Returns a receiver for outgoing events. The caller should forward
    /// events from this receiver to the WebSocket.
    pub async fn register(&self, connection_id: ConnectionId) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.connections.write().await.insert(connection_id, tx);
        rx
    }

    /// Unregister a connection (called on disconnect).
    pub async fn unregister(&self, connection_id: ConnectionId) {
        self.connections.write().await.remove(&connection_id);
    }

    /// Queue an event for a connection without waiting for room.
    pub async fn send_to(
        &self,
        connection_id: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), SendError> {
        let conns = self.connections.read().await;
        let sender = conns.get(&connection_id).ok_or(SendError::NotConnected)?;
        sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Disconnected,
        })
    }

    /// Hand a routed delivery to its connection.
    ///
    /// Failures are logged and counted; the frame is lost.
    pub async fn dispatch(&self, delivery: Delivery) {
        let kind = delivery.event.kind();
        if let Err(e) = self.send_to(delivery.to, delivery.event).await {
            warn!("Dropping {} for connection {}: {}", kind, delivery.to, e);
            metrics::record_delivery_failure(e.metric_label());
        }
    }

    /// Check if a connection is registered.
    pub async fn is_connected(&self, connection_id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&connection_id)
    }

    /// Get the total number of active connections.
    pub async fn total_connections(&self) -> usize {
        self.connections.read().await.len()
    }
}
