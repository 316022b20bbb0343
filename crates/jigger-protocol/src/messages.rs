//! Typed payloads carried in envelope `data`.
//!
//! Each payload implements [`Message`], which ties the Rust type to the
//! [`MessageKind`] it travels under. Response types derive `Default` and
//! use `#[serde(default)]` so that a server omitting zero-valued fields
//! still decodes.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::MessageKind;

/// A payload type with a fixed message kind.
pub trait Message: Serialize + DeserializeOwned + Send + 'static {
    /// The kind this payload is sent and routed under.
    const KIND: MessageKind;
}

macro_rules! message_kind {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(impl Message for $ty {
            const KIND: MessageKind = MessageKind::$kind;
        })*
    };
}

message_kind! {
    AuthRequest => AUTH_REQUEST,
    AuthResponse => AUTH_RESPONSE,
    GetUserInfoRequest => GET_USER_INFO_REQUEST,
    GetUserInfoResponse => GET_USER_INFO_RESPONSE,
    DrawCardRequest => DRAW_CARD_REQUEST,
    DrawCardResponse => DRAW_CARD_RESPONSE,
    CreateRoomRequest => CREATE_ROOM_REQUEST,
    CreateRoomResponse => CREATE_ROOM_RESPONSE,
    JoinRoomRequest => JOIN_ROOM_REQUEST,
    JoinRoomResponse => JOIN_ROOM_RESPONSE,
    LeaveRoomRequest => LEAVE_ROOM_REQUEST,
    LeaveRoomResponse => LEAVE_ROOM_RESPONSE,
    GameActionRequest => GAME_ACTION_REQUEST,
    GameActionResponse => GAME_ACTION_RESPONSE,
}

#[cfg(feature = "json")]
impl Message for GameNotification {
    const KIND: MessageKind = MessageKind::GAME_ACTION_NOTIFICATION;
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Status code (`ret`) the server puts in every response. 0 means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const OK: Self = Self(0);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// The first request on every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Opaque session token from the platform login. May be empty for guests.
    pub token: String,
    pub protocol_version: String,
    pub client_version: String,
    pub device_type: String,
    pub device_id: String,
    pub app_id: String,
    pub nonce: String,
    /// Epoch milliseconds at construction time.
    pub timestamp: u64,
    /// Reserved. Always empty; no signing scheme is defined.
    pub signature: String,
    pub is_guest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthResponse {
    pub ret: ErrorCode,
    pub uid: u64,
    pub nickname: String,
    pub gold: i64,
    pub diamond: i64,
    pub level: u32,
    pub exp: u64,
    pub conn_id: String,
    pub is_guest: bool,
    pub error_msg: String,
}

// ---------------------------------------------------------------------------
// User info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetUserInfoRequest {
    pub uid: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetUserInfoResponse {
    pub ret: ErrorCode,
    pub user_info: Option<UserInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    pub name: String,
    pub exp: u64,
    pub gold: i64,
    pub diamond: i64,
    pub draw_card_count: u32,
    pub backpack: Backpack,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Backpack {
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Card {
    pub id: u64,
    pub name: String,
    pub rarity: u32,
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawCardRequest {
    pub uid: u64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawCardResponse {
    pub ret: ErrorCode,
    pub cards: Vec<Card>,
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateRoomResponse {
    pub ret: ErrorCode,
    pub room: Option<Room>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Room {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub room_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinRoomResponse {
    pub ret: ErrorCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeaveRoomRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaveRoomResponse {
    pub ret: ErrorCode,
}

// ---------------------------------------------------------------------------
// Game actions
// ---------------------------------------------------------------------------

/// What a player does on their turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    PlaceCard,
    SkipTurn,
}

/// Which card from the hand goes where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceCard {
    /// Index into the player's hand.
    pub card_id: u32,
    /// Slot on the battlefield.
    pub target_index: u32,
}

/// One turn action. `place_card` is present exactly when
/// `action_type` is [`ActionType::PlaceCard`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameAction {
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_card: Option<PlaceCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameActionRequest {
    pub action: GameAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameActionResponse {
    pub ret: ErrorCode,
}

/// Informal notification with an embedded JSON body.
///
/// The `type` tag says what happened (`action`, `chat`, …); everything
/// else is kept verbatim in `fields` for the GUI to interpret.
///
/// ```json
/// { "type": "chat", "player_id": 7, "text": "hi" }
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameNotification {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<u64>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_decodes_with_missing_fields() {
        // The server may omit zero values entirely.
        let json = r#"{"uid": 42, "nickname": "Guest42"}"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();

        assert!(resp.ret.is_ok());
        assert_eq!(resp.uid, 42);
        assert_eq!(resp.nickname, "Guest42");
        assert_eq!(resp.gold, 0);
    }

    #[test]
    fn test_auth_response_failure_code() {
        let json = r#"{"ret": 1, "error_msg": "token expired"}"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();

        assert!(!resp.ret.is_ok());
        assert_eq!(resp.error_msg, "token expired");
    }

    #[test]
    fn test_action_type_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ActionType::PlaceCard).unwrap();
        assert_eq!(json, "\"PLACE_CARD\"");
    }

    #[test]
    fn test_skip_turn_omits_place_card() {
        let action = GameAction {
            action_type: ActionType::SkipTurn,
            place_card: None,
        };
        let json: serde_json::Value = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action_type"], "SKIP_TURN");
        assert!(json.get("place_card").is_none());
    }

    #[test]
    fn test_user_info_response_with_backpack() {
        let json = r#"{
            "ret": 0,
            "user_info": {
                "name": "pet",
                "gold": 100,
                "backpack": { "cards": [ { "id": 1, "name": "Fox", "rarity": 3 } ] }
            }
        }"#;
        let resp: GetUserInfoResponse = serde_json::from_str(json).unwrap();
        let info = resp.user_info.expect("user info present");

        assert_eq!(info.name, "pet");
        assert_eq!(info.backpack.cards.len(), 1);
        assert_eq!(info.backpack.cards[0].rarity, 3);
    }

    #[test]
    fn test_notification_keeps_unknown_fields() {
        let json = r#"{"type": "chat", "player_id": 7, "text": "hi"}"#;
        let note: GameNotification = serde_json::from_str(json).unwrap();

        assert_eq!(note.kind, "chat");
        assert_eq!(note.player_id, Some(7));
        assert_eq!(note.fields["text"], "hi");
    }

    #[test]
    fn test_message_kinds_are_bound_to_types() {
        assert_eq!(AuthRequest::KIND, MessageKind::AUTH_REQUEST);
        assert_eq!(DrawCardResponse::KIND, MessageKind::DRAW_CARD_RESPONSE);
        assert_eq!(GameNotification::KIND, MessageKind::GAME_ACTION_NOTIFICATION);
    }
}
