//! Wire protocol for the Jigger pet client.
//!
//! This crate defines what travels over the socket and nothing else:
//!
//! - **Framing** ([`FrameCodec`]): 4-byte little-endian length prefix,
//!   then one serialized [`Envelope`].
//! - **Envelope** ([`Envelope`], [`ClientId`], [`SequenceCounter`]): who
//!   sent it, its sequence number, its [`MessageKind`], and the payload.
//! - **Payloads** ([`messages`]): one typed struct per message kind, bound
//!   to its kind through the [`Message`] trait.
//! - **Requests** ([`catalog`]): validated builders for every request.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how bodies become bytes.
//!
//! # Architecture
//!
//! ```text
//! Transport (chunks) → Protocol (frames → Envelope) → Session / Dispatch
//! ```
//!
//! Nothing here touches the network or holds connection state. The
//! receive buffer is owned by the caller and handed to
//! [`FrameCodec::decode`] one frame at a time.

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

pub mod catalog;
mod codec;
mod envelope;
mod error;
mod frame;
mod kind;
pub mod messages;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use catalog::AuthParams;
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use envelope::{ClientId, Envelope, SequenceCounter};
pub use error::ProtocolError;
pub use frame::{DEFAULT_MAX_FRAME_LEN, FrameCodec, LENGTH_PREFIX_LEN, peek_frame_len};
pub use kind::MessageKind;
pub use messages::{ErrorCode, Message};
