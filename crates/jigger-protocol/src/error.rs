//! Error types for the protocol layer.
//!
//! When you see a `ProtocolError`, the problem is in framing,
//! serialization, or request construction, never in networking.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields,
    /// wrong data types, or truncated messages.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A complete frame arrived but its body is not a valid envelope.
    ///
    /// The frame's bytes have already been consumed from the receive
    /// buffer, so the stream stays in sync and decoding can continue
    /// with the next frame.
    #[error("malformed envelope in {len}-byte frame: {reason}")]
    MalformedEnvelope { len: usize, reason: String },

    /// A frame is larger than the configured maximum.
    ///
    /// On encode nothing is sent. On decode the peer is either corrupt
    /// or hostile, and the connection must be dropped.
    #[error("frame of {len} bytes exceeds the {max}-byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// A request builder rejected caller-supplied fields.
    ///
    /// Raised before any bytes touch the network.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
