//! Request builders.
//!
//! One function per request kind. Each checks the caller-supplied fields
//! and returns [`ProtocolError::InvalidRequest`] before anything is
//! serialized, so a bad request never costs a round trip. The builders
//! hold no state.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::envelope::random_uuid;
use crate::messages::{
    ActionType, AuthRequest, CreateRoomRequest, DrawCardRequest, GameAction,
    GameActionRequest, GetUserInfoRequest, JoinRoomRequest, LeaveRoomRequest,
    PlaceCard,
};
use crate::ProtocolError;

/// Protocol version announced in every auth request.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Client build announced in every auth request.
pub const CLIENT_VERSION: &str = "1.0.0";

/// Device type used when the caller doesn't pick one.
pub const DEFAULT_DEVICE_TYPE: &str = "desktop";

/// Caller-supplied half of an auth request.
///
/// The rest (versions, nonce, timestamp, signature) is filled in by
/// [`auth_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthParams {
    pub token: String,
    pub device_type: String,
    pub device_id: String,
    pub app_id: String,
    pub is_guest: bool,
}

impl AuthParams {
    /// Parameters for a token obtained from the platform login.
    pub fn with_token(
        token: impl Into<String>,
        device_id: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            device_type: DEFAULT_DEVICE_TYPE.to_string(),
            device_id: device_id.into(),
            app_id: app_id.into(),
            is_guest: false,
        }
    }

    /// Parameters for a guest login. The token may be empty.
    pub fn guest(
        token: impl Into<String>,
        device_id: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Self {
        Self {
            is_guest: true,
            ..Self::with_token(token, device_id, app_id)
        }
    }

    /// Overrides the device type (default `"desktop"`).
    pub fn device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }
}

/// Builds an AUTH_REQUEST payload with a fresh nonce and timestamp.
///
/// # Errors
/// `InvalidRequest` if `device_id`, `app_id` or `device_type` is blank, or
/// if a non-guest login has no token.
pub fn auth_request(params: &AuthParams) -> Result<AuthRequest, ProtocolError> {
    require(!params.device_id.trim().is_empty(), "device_id must not be empty")?;
    require(!params.app_id.trim().is_empty(), "app_id must not be empty")?;
    require(
        !params.device_type.trim().is_empty(),
        "device_type must not be empty",
    )?;
    require(
        params.is_guest || !params.token.is_empty(),
        "token is required unless logging in as a guest",
    )?;

    Ok(AuthRequest {
        token: params.token.clone(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        client_version: CLIENT_VERSION.to_string(),
        device_type: params.device_type.clone(),
        device_id: params.device_id.clone(),
        app_id: params.app_id.clone(),
        nonce: random_uuid(),
        timestamp: now_millis(),
        signature: String::new(),
        is_guest: params.is_guest,
    })
}

/// Builds a GET_USER_INFO_REQUEST for `uid`.
pub fn get_user_info(uid: u64) -> Result<GetUserInfoRequest, ProtocolError> {
    require(uid != 0, "uid must be non-zero")?;
    Ok(GetUserInfoRequest { uid })
}

/// Builds a DRAW_CARD_REQUEST for `count` cards.
pub fn draw_card(uid: u64, count: u32) -> Result<DrawCardRequest, ProtocolError> {
    require(uid != 0, "uid must be non-zero")?;
    require(count >= 1, "draw count must be at least 1")?;
    Ok(DrawCardRequest { uid, count })
}

/// Builds a CREATE_ROOM_REQUEST. Surrounding whitespace is trimmed.
pub fn create_room(name: &str) -> Result<CreateRoomRequest, ProtocolError> {
    let name = name.trim();
    require(!name.is_empty(), "room name must not be empty")?;
    Ok(CreateRoomRequest {
        name: name.to_string(),
    })
}

/// Builds a JOIN_ROOM_REQUEST.
pub fn join_room(room_id: u64) -> Result<JoinRoomRequest, ProtocolError> {
    require(room_id != 0, "room id must be non-zero")?;
    Ok(JoinRoomRequest { room_id })
}

/// Builds a LEAVE_ROOM_REQUEST. There is nothing to validate.
pub fn leave_room() -> LeaveRoomRequest {
    LeaveRoomRequest {}
}

/// A place-card action.
pub fn place_card(card_id: u32, target_index: u32) -> GameAction {
    GameAction {
        action_type: ActionType::PlaceCard,
        place_card: Some(PlaceCard {
            card_id,
            target_index,
        }),
    }
}

/// A skip-turn action.
pub fn skip_turn() -> GameAction {
    GameAction {
        action_type: ActionType::SkipTurn,
        place_card: None,
    }
}

/// Wraps a game action into a GAME_ACTION_REQUEST.
///
/// # Errors
/// `InvalidRequest` if the action type and its details disagree.
pub fn game_action(action: GameAction) -> Result<GameActionRequest, ProtocolError> {
    match (action.action_type, &action.place_card) {
        (ActionType::PlaceCard, None) => {
            return Err(invalid("PLACE_CARD requires a card and target"));
        }
        (ActionType::SkipTurn, Some(_)) => {
            return Err(invalid("SKIP_TURN must not carry a card"));
        }
        _ => {}
    }
    Ok(GameActionRequest { action })
}

/// Builds a GAME_ACTION_NOTIFICATION with an embedded JSON body.
///
/// # Errors
/// `InvalidRequest` if `kind` is blank or `fields` tries to redefine the
/// reserved `type` / `player_id` keys.
#[cfg(feature = "json")]
pub fn notification(
    kind: &str,
    player_id: Option<u64>,
    fields: serde_json::Map<String, serde_json::Value>,
) -> Result<crate::messages::GameNotification, ProtocolError> {
    require(!kind.trim().is_empty(), "notification type must not be empty")?;
    require(
        !fields.contains_key("type") && !fields.contains_key("player_id"),
        "fields must not redefine `type` or `player_id`",
    )?;
    Ok(crate::messages::GameNotification {
        kind: kind.to_string(),
        player_id,
        fields,
    })
}

fn require(condition: bool, message: &str) -> Result<(), ProtocolError> {
    if condition { Ok(()) } else { Err(invalid(message)) }
}

fn invalid(message: &str) -> ProtocolError {
    ProtocolError::InvalidRequest(message.to_string())
}

/// Milliseconds since the Unix epoch. A clock before 1970 reads as 0.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
