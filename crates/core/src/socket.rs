//! The socket abstraction a call bridge runs over.
//!
//! A `MediaSocket` is the telephony provider's WebSocket seen through three
//! capabilities: send a text frame, wait for the next event, and close. The
//! methods take `&self` so the bridge and the transport adapter can share one
//! socket behind an `Arc` without either of them owning it outright.

use async_trait::async_trait;

/// Something that happened on the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Text(String),
    Binary(Vec<u8>),
    /// The peer closed the connection (or the close handshake completed).
    Closed { code: Option<u16>, reason: String },
    /// The connection failed. No further events follow.
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("socket is closed")]
    Closed,
    #[error("failed to send on socket: {0}")]
    Send(String),
}

#[async_trait]
pub trait MediaSocket: Send + Sync {
    /// Sends a text frame.
    async fn send(&self, text: String) -> Result<(), SocketError>;

    /// Waits for the next event. Returns `None` once the socket is exhausted.
    async fn next_event(&self) -> Option<SocketEvent>;

    /// Closes the socket. Closing an already-closed socket is not an error.
    async fn close(&self) -> Result<(), SocketError>;
}
