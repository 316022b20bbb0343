//! Authentication handshake for the Jigger client.
//!
//! Every connection must authenticate before anything else is useful.
//! This crate tracks that handshake:
//!
//! 1. **State machine** ([`AuthSession`], [`AuthState`]): idle,
//!    authenticating, authenticated, or failed.
//! 2. **Identity** ([`AuthIdentity`]): who the server says we are, built
//!    once from a successful AUTH_RESPONSE.
//! 3. **Gatekeeping** ([`AuthSession::require_authenticated`]): the local
//!    `NotAuthenticated` check applied before any other request is sent.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client engine (above)  ← drives the session from send path and receive loop
//!     ↕
//! Session Layer (this crate)  ← handshake state, identity
//!     ↕
//! Protocol Layer (below)  ← AuthResponse, ErrorCode
//! ```
//!
//! Nothing here performs I/O. Sending AUTH_REQUEST and routing
//! AUTH_RESPONSE back in is the client's job.

mod error;
mod identity;
mod session;

pub use error::SessionError;
pub use identity::AuthIdentity;
pub use session::{AuthOutcome, AuthSession, AuthState, PendingAuth};
