//! Sockets for Seasapper.
//!
//! The server never touches a socket library directly. It accepts
//! [`Connection`]s from a [`Transport`] and exchanges frames with them:
//!
//! - one frame carries exactly one protocol message, JSON encoded
//! - outgoing UTF-8 payloads go out as text frames so browsers can
//!   `JSON.parse` them; anything else is sent binary
//! - [`Connection::recv`] yields `None` once the peer closes, which the
//!   room treats as a disconnect and starts that player's reconnect grace
//!
//! Every accepted socket is stamped with a fresh [`ConnectionId`] from a
//! [`ConnectionIds`] allocator owned by the transport.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`] on `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod id;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use id::{ConnectionId, ConnectionIds};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

/// A listener producing player connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops taking new players. Open connections are left alone; their
    /// handlers drain on the server's shutdown signal.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// One player's socket.
///
/// A handler parks in `recv` while room broadcasts arrive through `send`,
/// so the two must not serialize on a shared lock.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one encoded message as a single frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads the next message frame, skipping control frames.
    ///
    /// `Ok(None)` means the peer closed cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
