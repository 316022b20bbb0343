//! What the client reports to the GUI.
//!
//! Connection and auth state are also published on `watch` channels (see
//! [`Client::subscribe_state`](crate::Client::subscribe_state)); the event
//! stream carries the same transitions plus the one-off failures that have
//! no state of their own.

use std::fmt;
use std::sync::Arc;

use jigger_protocol::{ErrorCode, MessageKind};
use jigger_session::AuthIdentity;
use tokio::sync::mpsc;

/// Receiving end of the client's event stream.
pub type ClientEvents = mpsc::UnboundedReceiver<ClientEvent>;

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Lifecycle of the underlying connection.
///
/// ```text
/// Disconnected ──connect()──→ Connecting ──ok──→ Connected ──close()/write error──→ Closing
///    ↑  ↑                         │                  │                                 │
///    │  └─────── failed ──────────┘                  └── peer close / read error ──┐   │
///    └─────────────────────────────────────────────────────────────────────────────┴───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// DisconnectReason
// ---------------------------------------------------------------------------

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// [`Client::close`](crate::Client::close) was called.
    Closed,
    /// The server closed the connection.
    PeerClosed,
    /// Reading from the socket failed.
    ReadFailed(String),
    /// Writing to the socket failed.
    WriteFailed(String),
    /// The peer announced a frame larger than the configured maximum.
    FrameTooLarge { len: usize, max: usize },
    /// Undecoded data piled up past the configured maximum.
    BufferOverflow { len: usize, max: usize },
}

impl DisconnectReason {
    /// `true` unless the connection was closed on purpose.
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("closed locally"),
            Self::PeerClosed => f.write_str("closed by peer"),
            Self::ReadFailed(e) => write!(f, "read failed: {e}"),
            Self::WriteFailed(e) => write!(f, "write failed: {e}"),
            Self::FrameTooLarge { len, max } => {
                write!(f, "peer sent a {len}-byte frame (limit {max})")
            }
            Self::BufferOverflow { len, max } => {
                write!(f, "receive buffer reached {len} bytes (limit {max})")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// A discrete notification from the client engine.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The connection moved to a new state.
    StateChanged(ConnectionState),

    /// The server accepted the login.
    Authenticated(Arc<AuthIdentity>),

    /// The login failed. `code` is the server's status, or `None` when the
    /// client gave up waiting.
    AuthFailed {
        code: Option<ErrorCode>,
        message: String,
    },

    /// One inbound frame couldn't be decoded and was skipped.
    MalformedFrame { len: usize, reason: String },

    /// A handler failed (or panicked) on one message. Later messages are
    /// still delivered.
    DispatchFailed {
        kind: MessageKind,
        seq: u64,
        error: String,
    },

    /// The connection ended. Any session state is gone.
    Disconnected(DisconnectReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_reason_display_and_severity() {
        let reason = DisconnectReason::BufferOverflow { len: 10, max: 8 };
        assert_eq!(reason.to_string(), "receive buffer reached 10 bytes (limit 8)");
        assert!(reason.is_error());
        assert!(!DisconnectReason::Closed.is_error());
    }
}
