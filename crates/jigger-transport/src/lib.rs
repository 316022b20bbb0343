//! Transport abstraction layer for Jigger.
//!
//! Provides the [`Connector`], [`ByteSink`] and [`ByteStream`] traits that
//! abstract over the duplex connection the client talks to the game server
//! through. A connection is opened by a connector and handed back as two
//! halves so that the write side and the read side can be driven from
//! different tasks without contending on one lock.
//!
//! The transport knows nothing about frames or envelopes. A chunk returned
//! by [`ByteStream::recv`] may hold part of a frame, exactly one frame, or
//! several frames back to back; reassembly is the protocol layer's job.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket client via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnector, WebSocketSink, WebSocketStream};

use std::fmt;
use std::future::Future;

/// Opaque identifier for one established connection.
///
/// Every successful [`Connector::connect`] yields a fresh id, so the id
/// doubles as a connection generation: anything tagged with an older id
/// belongs to a connection that no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw generation number.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw generation number, for atomics and logs.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opens duplex connections to a remote endpoint.
pub trait Connector: Send + Sync + 'static {
    /// The write half produced by this connector.
    type Sink: ByteSink;
    /// The read half produced by this connector.
    type Stream: ByteStream;

    /// Establishes a connection to `uri`.
    ///
    /// Makes exactly one attempt. Retrying is the caller's decision.
    fn connect(
        &self,
        uri: &str,
    ) -> impl Future<
        Output = Result<(ConnectionId, Self::Sink, Self::Stream), TransportError>,
    > + Send;
}

/// The write half of a connection.
pub trait ByteSink: Send + 'static {
    /// Sends one chunk of bytes to the remote peer.
    ///
    /// The chunk is delivered as a unit; two calls never interleave.
    fn send(
        &mut self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Closes the write side, telling the peer we are going away.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// The read half of a connection.
pub trait ByteStream: Send + 'static {
    /// Receives the next chunk of bytes from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &mut self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;
}
