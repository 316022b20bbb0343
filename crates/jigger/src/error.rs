//! Unified error type for the Jigger client.

use std::time::Duration;

use jigger_protocol::ProtocolError;
use jigger_session::SessionError;
use jigger_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Everything a [`Client`](crate::Client) method can return. Failures that
/// happen inside the receive loop are never returned; they surface as
/// [`ClientEvent`](crate::ClientEvent)s instead.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error that isn't covered by a variant below.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Request construction or serialization failed. Includes
    /// `InvalidRequest` from the request builders and `FrameTooLarge`
    /// for oversized outbound payloads.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session precondition failed (`NotAuthenticated`,
    /// `AuthInProgress`) or the server rejected the login.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The socket could not be established. The client stays usable and
    /// may try again; callers usually fall back to offline mode.
    #[error("could not connect to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The call needs a live connection and there isn't one.
    #[error("not connected")]
    NotConnected,

    /// `connect()` was called while a connection is already open or
    /// being opened.
    #[error("already connected")]
    AlreadyConnected,

    /// Writing a frame failed. The connection is torn down.
    #[error("write failed: {0}")]
    WriteFailed(#[source] TransportError),

    /// No auth response arrived within the configured timeout.
    #[error("no auth response within {0:?}")]
    AuthTimeout(Duration),
}

impl ClientError {
    /// `true` for the local precondition failures: nothing was sent.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::AlreadyConnected
                | Self::Session(SessionError::NotAuthenticated | SessionError::AuthInProgress)
                | Self::Protocol(ProtocolError::InvalidRequest(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let client_err: ClientError = err.into();
        assert!(matches!(client_err, ClientError::Transport(_)));
        assert!(client_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidRequest("count".into());
        let client_err: ClientError = err.into();
        assert!(matches!(client_err, ClientError::Protocol(_)));
        assert!(client_err.is_precondition());
    }

    #[test]
    fn test_from_session_error() {
        let client_err: ClientError = SessionError::NotAuthenticated.into();
        assert!(matches!(
            client_err,
            ClientError::Session(SessionError::NotAuthenticated)
        ));
        assert!(client_err.is_precondition());
    }

    #[test]
    fn test_write_failed_is_not_a_precondition() {
        let err = ClientError::WriteFailed(TransportError::ConnectionClosed("x".into()));
        assert!(!err.is_precondition());
    }
}
