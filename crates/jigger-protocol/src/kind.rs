//! Message kinds: the integer discriminator carried by every envelope.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Selects the payload type of an envelope and the handler it is routed to.
///
/// The set of kinds is shared with the server, but a newer server may send
/// kinds this build has never heard of. `MessageKind` is therefore a
/// transparent `u32` rather than a closed enum: unknown values still
/// decode, and the dispatcher drops them instead of failing the frame.
///
/// Responses use the request's value plus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKind(pub u32);

impl MessageKind {
    pub const AUTH_REQUEST: Self = Self(2);
    pub const AUTH_RESPONSE: Self = Self(3);
    pub const GET_USER_INFO_REQUEST: Self = Self(4);
    pub const GET_USER_INFO_RESPONSE: Self = Self(5);
    pub const DRAW_CARD_REQUEST: Self = Self(16);
    pub const DRAW_CARD_RESPONSE: Self = Self(17);
    pub const CREATE_ROOM_REQUEST: Self = Self(20);
    pub const CREATE_ROOM_RESPONSE: Self = Self(21);
    pub const JOIN_ROOM_REQUEST: Self = Self(22);
    pub const JOIN_ROOM_RESPONSE: Self = Self(23);
    pub const LEAVE_ROOM_REQUEST: Self = Self(24);
    pub const LEAVE_ROOM_RESPONSE: Self = Self(25);
    pub const GAME_ACTION_REQUEST: Self = Self(26);
    pub const GAME_ACTION_RESPONSE: Self = Self(27);
    /// Server push (or client broadcast) with an embedded JSON body.
    pub const GAME_ACTION_NOTIFICATION: Self = Self(30);

    /// Every kind this build knows about.
    pub const ALL: [Self; 15] = [
        Self::AUTH_REQUEST,
        Self::AUTH_RESPONSE,
        Self::GET_USER_INFO_REQUEST,
        Self::GET_USER_INFO_RESPONSE,
        Self::DRAW_CARD_REQUEST,
        Self::DRAW_CARD_RESPONSE,
        Self::CREATE_ROOM_REQUEST,
        Self::CREATE_ROOM_RESPONSE,
        Self::JOIN_ROOM_REQUEST,
        Self::JOIN_ROOM_RESPONSE,
        Self::LEAVE_ROOM_REQUEST,
        Self::LEAVE_ROOM_RESPONSE,
        Self::GAME_ACTION_REQUEST,
        Self::GAME_ACTION_RESPONSE,
        Self::GAME_ACTION_NOTIFICATION,
    ];

    /// Returns the symbolic name, or `None` for a kind unknown to this build.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::AUTH_REQUEST => "AUTH_REQUEST",
            Self::AUTH_RESPONSE => "AUTH_RESPONSE",
            Self::GET_USER_INFO_REQUEST => "GET_USER_INFO_REQUEST",
            Self::GET_USER_INFO_RESPONSE => "GET_USER_INFO_RESPONSE",
            Self::DRAW_CARD_REQUEST => "DRAW_CARD_REQUEST",
            Self::DRAW_CARD_RESPONSE => "DRAW_CARD_RESPONSE",
            Self::CREATE_ROOM_REQUEST => "CREATE_ROOM_REQUEST",
            Self::CREATE_ROOM_RESPONSE => "CREATE_ROOM_RESPONSE",
            Self::JOIN_ROOM_REQUEST => "JOIN_ROOM_REQUEST",
            Self::JOIN_ROOM_RESPONSE => "JOIN_ROOM_RESPONSE",
            Self::LEAVE_ROOM_REQUEST => "LEAVE_ROOM_REQUEST",
            Self::LEAVE_ROOM_RESPONSE => "LEAVE_ROOM_RESPONSE",
            Self::GAME_ACTION_REQUEST => "GAME_ACTION_REQUEST",
            Self::GAME_ACTION_RESPONSE => "GAME_ACTION_RESPONSE",
            Self::GAME_ACTION_NOTIFICATION => "GAME_ACTION_NOTIFICATION",
            _ => return None,
        };
        Some(name)
    }

    /// Returns `true` if this build has a name for the kind.
    pub fn is_known(self) -> bool {
        self.name().is_some()
    }

    /// Returns the kind the server answers this request with.
    ///
    /// `None` for responses, notifications, and unknown kinds.
    pub fn response(self) -> Option<Self> {
        match self {
            Self::AUTH_REQUEST
            | Self::GET_USER_INFO_REQUEST
            | Self::DRAW_CARD_REQUEST
            | Self::CREATE_ROOM_REQUEST
            | Self::JOIN_ROOM_REQUEST
            | Self::LEAVE_ROOM_REQUEST
            | Self::GAME_ACTION_REQUEST => Some(Self(self.0 + 1)),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "UNKNOWN({})", self.0),
        }
    }
}
