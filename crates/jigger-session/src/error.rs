//! Error types for the session layer.

use jigger_protocol::ErrorCode;

/// Errors raised by the authentication handshake.
///
/// All of these are local to the session: none of them mean the
/// connection itself is broken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The server answered AUTH_RESPONSE with a non-zero status.
    /// `message` is the server's own explanation, passed through as-is.
    #[error("authentication rejected (code {code}): {message}")]
    AuthRejected { code: ErrorCode, message: String },

    /// A request that needs a logged-in session was attempted before
    /// authentication succeeded. Raised without touching the network.
    #[error("not authenticated")]
    NotAuthenticated,

    /// `authenticate()` was called while an earlier attempt is still
    /// waiting for its response. The second request is never sent.
    #[error("authentication already in progress")]
    AuthInProgress,
}
