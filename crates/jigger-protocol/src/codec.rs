//! Body serialization.
//!
//! The same codec is used twice per message: once for the payload that
//! goes into `Envelope::payload`, and once for the envelope itself inside
//! the frame. [`FrameCodec`](crate::FrameCodec) is generic over it.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Turns serde types into frame bodies and back.
///
/// `decode` uses `DeserializeOwned` so the result never borrows from the
/// receive buffer; the frame's bytes are drained right after decoding.
pub trait Codec: Send + Sync + 'static {
    /// # Errors
    /// `ProtocolError::Encode` if `value` can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// `ProtocolError::Decode` if `data` isn't a `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// `serde_json` bodies.
///
/// This is what the game server's guest endpoint speaks inside each
/// length-prefixed frame. It is behind the `json` feature flag (enabled
/// by default).
///
/// ## Example
///
/// ```rust
/// use jigger_protocol::{ClientId, Codec, Envelope, JsonCodec, MessageKind};
///
/// let sent = Envelope {
///     client_id: ClientId::new("c-1"),
///     seq: 1,
///     kind: MessageKind::AUTH_REQUEST,
///     payload: b"{}".to_vec(),
/// };
///
/// let body = JsonCodec.encode(&sent).unwrap();
/// let received: Envelope = JsonCodec.decode(&body).unwrap();
/// assert_eq!(received.kind, MessageKind::AUTH_REQUEST);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
