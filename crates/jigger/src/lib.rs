//! # Jigger
//!
//! Client engine for the Jigger desktop pet's game server.
//!
//! The engine owns one duplex connection and speaks the server's framed
//! protocol over it: typed requests go out as length-prefixed envelopes,
//! inbound bytes are reassembled into envelopes and routed to handlers,
//! and the mandatory login handshake gates everything else.
//!
//! ## Layers
//!
//! ```text
//! jigger            Client, MessageDispatcher, events   (this crate)
//! jigger-session    AuthSession state machine
//! jigger-protocol   frames, envelopes, payloads, request builders
//! jigger-transport  WebSocket connector
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jigger::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let (client, mut events) = Client::builder(ClientConfig::default()).build();
//!
//! if let Err(e) = client.connect().await {
//!     eprintln!("server unreachable, staying offline: {e}");
//!     return Ok(());
//! }
//! client.login(&client.auth_params("", "device-1", true)).await?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod dispatcher;
mod error;
mod events;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, DEFAULT_APP_ID, DEFAULT_ENDPOINT};
pub use dispatcher::{Dispatch, Handler, HandlerError, MessageDispatcher};
pub use error::ClientError;
pub use events::{ClientEvent, ClientEvents, ConnectionState, DisconnectReason};

pub use jigger_protocol as protocol;
pub use jigger_session as session;
pub use jigger_transport as transport;

/// Everything a GUI needs to drive the client.
pub mod prelude {
    pub use crate::{
        Client, ClientBuilder, ClientConfig, ClientError, ClientEvent, ClientEvents,
        ConnectionState, DisconnectReason, HandlerError, MessageDispatcher,
    };
    pub use jigger_protocol::catalog::{place_card, skip_turn};
    pub use jigger_protocol::messages::*;
    pub use jigger_protocol::{AuthParams, Envelope, MessageKind, ProtocolError};
    pub use jigger_session::{AuthIdentity, AuthState, SessionError};
    pub use jigger_transport::TransportError;
}
