//! QMI transport abstraction.
//!
//! Defines the `QmiTransport` trait for the message channel, allowing
//! different implementations (IPC router socket, mock, etc.).

use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to connect to node {node} port {port}: {reason}")]
    ConnectFailed { node: u32, port: u32, reason: String },

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Channel not connected")]
    NotConnected,

    #[error("Connection reset by peer")]
    ConnectionReset,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Address of a discovered service endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceAddress {
    pub node: u32,
    pub port: u32,
}

impl std::fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node, self.port)
    }
}

/// Receives responses read off the channel.
pub trait ResponseSink: Send + Sync {
    /// Hands a response to its waiting transaction. Returns `false` when no
    /// transaction matches and the payload was dropped.
    fn deliver(&self, txn_id: u16, msg_id: u16, payload: &[u8]) -> bool;
}

/// Abstract QMI channel.
///
/// Requests are fire-and-forget at this level: responses come back through
/// the `ResponseSink` registered at connect time, possibly on another
/// thread.
pub trait QmiTransport: Send + Sync {
    /// Bind the channel to a discovered service.
    fn connect(
        &self,
        addr: ServiceAddress,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<(), TransportError>;

    /// Send one encoded request.
    fn send_request(&self, txn_id: u16, msg_id: u16, payload: &[u8])
    -> Result<(), TransportError>;

    /// Drop the binding.
    fn disconnect(&self);

    fn is_connected(&self) -> bool;
}
