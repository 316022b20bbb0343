//! The envelope wrapping every payload, plus the identity and sequencing
//! that go with it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::MessageKind;

// ---------------------------------------------------------------------------
// ClientId
// ---------------------------------------------------------------------------

/// Opaque client-generated identifier carried in every envelope.
///
/// Generated once per client and kept for the lifetime of its connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random UUID-v4-shaped identifier.
    pub fn generate() -> Self {
        Self(random_uuid())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fresh random UUID-v4 string.
pub(crate) fn random_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The typed wrapper carried inside one frame.
///
/// The serde names are the field identities the server expects
/// (`clientId`, `msgSerialNo`, `id`, `data`).
///
/// ```text
/// ┌──────────────────────────────────┐
/// │ clientId:    "6f1c…"             │  ← who sent it
/// │ msgSerialNo: 42                  │  ← per-connection sequence
/// │ id:          16 (DRAW_CARD_REQ)  │  ← payload type / routing key
/// │ data:        { "uid": 42, … }    │  ← the payload, inline
/// └──────────────────────────────────┘
/// ```
///
/// In memory the payload is always bytes. With the `json` feature a
/// payload that is itself JSON is written inline as `data`, so the server
/// sees `"data": {"uid": 42}` rather than a list of byte values; anything
/// else falls back to a byte array. Both shapes are accepted on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "clientId")]
    pub client_id: ClientId,

    /// Strictly increasing per connection, starting at 1.
    #[serde(rename = "msgSerialNo")]
    pub seq: u64,

    #[serde(rename = "id")]
    pub kind: MessageKind,

    /// The serialized payload body. Empty payloads may be omitted on the wire.
    #[serde(rename = "data", default)]
    #[cfg_attr(feature = "json", serde(with = "inline_json"))]
    pub payload: Vec<u8>,
}

/// `data` as embedded JSON.
#[cfg(feature = "json")]
mod inline_json {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        match serde_json::from_slice::<Value>(payload) {
            Ok(value) if !value.is_array() => value.serialize(serializer),
            // Not JSON, or a top-level array that would read back as bytes.
            _ => payload.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| D::Error::custom("`data` array must hold bytes"))
                })
                .collect(),
            value => serde_json::to_vec(&value).map_err(D::Error::custom),
        }
    }
}

// ---------------------------------------------------------------------------
// SequenceCounter
// ---------------------------------------------------------------------------

/// Hands out envelope sequence numbers: 1, 2, 3, … with no gaps.
///
/// One counter belongs to one connection. A new connection gets a new
/// counter, so numbering restarts at 1 after every reconnect.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    last: AtomicU64,
}

impl SequenceCounter {
    /// Creates a counter whose first [`next`](Self::next) returns 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next sequence number.
    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns the most recently issued number, or 0 if none yet.
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}
