//! Length-prefixed framing.
//!
//! A frame is a 4-byte little-endian length followed by exactly that many
//! bytes of serialized [`Envelope`]:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ len: u32 LE  │ envelope body (len bytes)    │
//! └──────────────┴──────────────────────────────┘
//! ```
//!
//! The transport hands over arbitrary chunks, so one chunk may hold half a
//! frame or several frames. [`FrameCodec::decode`] pulls at most one
//! complete frame off the front of the receive buffer per call and leaves
//! partial frames untouched.

use bytes::{Buf, BytesMut};

use crate::{Codec, Envelope, ProtocolError};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Default ceiling on a single envelope body (4 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// Encodes envelopes into frames and extracts envelopes from a byte buffer.
///
/// Stateless apart from its configuration; the receive buffer belongs to
/// the caller. Decoding advances the buffer's start in place, so taking N
/// frames off one buffer costs O(N) rather than shifting the tail down
/// after every frame.
#[derive(Debug, Clone)]
pub struct FrameCodec<C: Codec> {
    codec: C,
    max_frame_len: usize,
}

impl<C: Codec> FrameCodec<C> {
    /// Creates a frame codec with the default size limit.
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Sets the largest envelope body accepted in either direction.
    ///
    /// Values above `u32::MAX` are clamped, since the prefix can't express
    /// them anyway.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len.min(u32::MAX as usize);
        self
    }

    /// Returns the configured body size limit.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Returns the codec used for envelope bodies.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Serializes `envelope` and prepends its length.
    ///
    /// # Errors
    /// - [`ProtocolError::FrameTooLarge`] if the body exceeds the limit.
    ///   Nothing is truncated.
    /// - Whatever the codec reports if serialization fails.
    pub fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, ProtocolError> {
        let body = self.codec.encode(envelope)?;
        if body.len() > self.max_frame_len {
            return Err(ProtocolError::FrameTooLarge {
                len: body.len(),
                max: self.max_frame_len,
            });
        }

        let mut frame = Vec::with_capacity(LENGTH_PREFIX_LEN + body.len());
        frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Tries to take one complete frame off the front of `buffer`.
    ///
    /// - `Ok(None)`: fewer than 4 bytes, or the declared body hasn't fully
    ///   arrived. `buffer` is left exactly as it was.
    /// - `Ok(Some(envelope))`: the frame's bytes have been removed.
    ///
    /// # Errors
    /// - [`ProtocolError::MalformedEnvelope`] if the body doesn't decode.
    ///   The frame's bytes are still removed, so the caller can log it and
    ///   keep decoding the rest of the buffer.
    /// - [`ProtocolError::FrameTooLarge`] if the declared length exceeds the
    ///   limit, whether or not the body is complete. Nothing is removed;
    ///   the stream can't be trusted past this point.
    pub fn decode(&self, buffer: &mut BytesMut) -> Result<Option<Envelope>, ProtocolError> {
        let Some(len) = peek_frame_len(buffer) else {
            return Ok(None);
        };
        if len > self.max_frame_len {
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        let total = LENGTH_PREFIX_LEN + len;
        if buffer.len() < total {
            return Ok(None);
        }

        let decoded = self
            .codec
            .decode::<Envelope>(&buffer[LENGTH_PREFIX_LEN..total]);
        buffer.advance(total);

        decoded
            .map(Some)
            .map_err(|e| ProtocolError::MalformedEnvelope {
                len,
                reason: e.to_string(),
            })
    }
}

/// Reads the declared body length, if the prefix has arrived.
pub fn peek_frame_len(buffer: &[u8]) -> Option<usize> {
    let prefix: [u8; LENGTH_PREFIX_LEN] =
        buffer.get(..LENGTH_PREFIX_LEN)?.try_into().ok()?;
    Some(u32::from_le_bytes(prefix) as usize)
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientId, JsonCodec, MessageKind};

    fn buf(bytes: &[u8]) -> BytesMut {
        BytesMut::from(bytes)
    }

    fn codec() -> FrameCodec<JsonCodec> {
        FrameCodec::new(JsonCodec)
    }

    fn envelope(seq: u64, kind: MessageKind, payload: &[u8]) -> Envelope {
        Envelope {
            client_id: ClientId::new("client-1"),
            seq,
            kind,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn test_encode_prefixes_little_endian_length() {
        let env = envelope(1, MessageKind::AUTH_REQUEST, b"x");
        let frame = codec().encode(&env).unwrap();
        let body_len = serde_json::to_vec(&env).unwrap().len();

        assert_eq!(frame.len(), LENGTH_PREFIX_LEN + body_len);
        assert_eq!(&frame[..4], &(body_len as u32).to_le_bytes());
    }

    #[test]
    fn test_decode_encoded_frame_returns_envelope_and_empties_buffer() {
        let env = envelope(3, MessageKind::DRAW_CARD_REQUEST, &[9, 9, 9]);
        let mut buffer = buf(&codec().encode(&env).unwrap());

        let decoded = codec().decode(&mut buffer).unwrap();

        assert_eq!(decoded, Some(env));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_any_strict_prefix_is_incomplete_and_untouched() {
        let env = envelope(1, MessageKind::CREATE_ROOM_REQUEST, b"room");
        let frame = codec().encode(&env).unwrap();

        for k in 0..frame.len() {
            let mut buffer = buf(&frame[..k]);
            let decoded = codec().decode(&mut buffer).unwrap();
            assert_eq!(decoded, None, "prefix of {k} bytes should be incomplete");
            assert_eq!(buffer, &frame[..k], "prefix of {k} bytes should be untouched");
        }
    }

    #[test]
    fn test_decode_concatenated_frames_in_order() {
        let envs: Vec<Envelope> = (1..=4)
            .map(|seq| envelope(seq, MessageKind(seq as u32 + 100), &[seq as u8]))
            .collect();
        let mut buffer: BytesMut = envs
            .iter()
            .flat_map(|e| codec().encode(e).unwrap())
            .collect();

        let mut decoded = Vec::new();
        while let Some(env) = codec().decode(&mut buffer).unwrap() {
            decoded.push(env);
        }

        assert_eq!(decoded, envs);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_drains_many_small_frames_from_one_buffer() {
        let count = 20_000u64;
        let mut buffer = BytesMut::new();
        for seq in 1..=count {
            let env = envelope(seq, MessageKind::AUTH_RESPONSE, b"k");
            buffer.extend(codec().encode(&env).unwrap());
        }
        let start = buffer.as_ptr() as usize;

        let mut next = 1;
        while let Some(env) = codec().decode(&mut buffer).unwrap() {
            assert_eq!(env.seq, next);
            next += 1;
        }

        assert_eq!(next, count + 1);
        assert!(buffer.is_empty());
        // Frames are taken by moving the start forward, never by copying.
        assert!(buffer.as_ptr() as usize > start);
    }

    #[test]
    fn test_decode_keeps_trailing_partial_frame() {
        let first = envelope(1, MessageKind::AUTH_REQUEST, b"a");
        let second = envelope(2, MessageKind::AUTH_REQUEST, b"b");
        let second_frame = codec().encode(&second).unwrap();

        let mut buffer = buf(&codec().encode(&first).unwrap());
        buffer.extend_from_slice(&second_frame[..6]);

        assert_eq!(codec().decode(&mut buffer).unwrap(), Some(first));
        assert_eq!(buffer, &second_frame[..6]);
        assert_eq!(codec().decode(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_decode_malformed_body_consumes_frame_and_continues() {
        let good = envelope(2, MessageKind::AUTH_RESPONSE, b"ok");
        let garbage = b"not an envelope";

        let mut buffer = buf(&(garbage.len() as u32).to_le_bytes());
        buffer.extend_from_slice(garbage);
        buffer.extend(codec().encode(&good).unwrap());

        let result = codec().decode(&mut buffer);
        assert!(
            matches!(
                result,
                Err(ProtocolError::MalformedEnvelope { len, .. }) if len == garbage.len()
            ),
            "expected MalformedEnvelope, got {result:?}"
        );

        // The corrupt frame is gone; the next one decodes normally.
        assert_eq!(codec().decode(&mut buffer).unwrap(), Some(good));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_zero_length_frame_is_malformed() {
        let mut buffer = buf(&0u32.to_le_bytes());
        let result = codec().decode(&mut buffer);
        assert!(matches!(result, Err(ProtocolError::MalformedEnvelope { len: 0, .. })));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_encode_rejects_oversized_body() {
        let small = codec().with_max_frame_len(32);
        let env = envelope(1, MessageKind::AUTH_REQUEST, &[0; 64]);

        let result = small.encode(&env);

        assert!(matches!(
            result,
            Err(ProtocolError::FrameTooLarge { max: 32, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_declared_length_before_body_arrives() {
        let small = codec().with_max_frame_len(16);
        let mut buffer = buf(&1_000u32.to_le_bytes());
        buffer.extend_from_slice(b"partial");

        let result = small.decode(&mut buffer);

        assert!(matches!(
            result,
            Err(ProtocolError::FrameTooLarge { len: 1_000, max: 16 })
        ));
        assert_eq!(buffer.len(), 4 + 7, "nothing should be consumed");
    }

    #[test]
    fn test_peek_frame_len() {
        assert_eq!(peek_frame_len(&[1, 2, 3]), None);
        assert_eq!(peek_frame_len(&[9, 0, 0, 0]), Some(9));
        assert_eq!(peek_frame_len(&[0, 1, 0, 0, 0xff]), Some(256));
    }
}
