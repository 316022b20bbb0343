//! The identity the server hands back after a successful handshake.

use jigger_protocol::messages::AuthResponse;

/// Who the client is logged in as, plus the balances shown in the GUI.
///
/// Built once from a successful AUTH_RESPONSE and never mutated. A fresh
/// login produces a new identity rather than updating this one, so it is
/// shared as `Arc<AuthIdentity>` and read without locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub user_id: u64,
    pub nickname: String,
    pub gold: i64,
    pub diamond: i64,
    pub level: u32,
    pub experience: u64,
    /// Server-side connection id, useful when reading server logs.
    pub connection_id: String,
    pub is_guest: bool,
}

impl From<&AuthResponse> for AuthIdentity {
    fn from(resp: &AuthResponse) -> Self {
        Self {
            user_id: resp.uid,
            nickname: resp.nickname.clone(),
            gold: resp.gold,
            diamond: resp.diamond,
            level: resp.level,
            experience: resp.exp,
            connection_id: resp.conn_id.clone(),
            is_guest: resp.is_guest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_response_maps_every_field() {
        let resp = AuthResponse {
            uid: 42,
            nickname: "Guest42".into(),
            gold: 100,
            diamond: 5,
            level: 3,
            exp: 250,
            conn_id: "conn-9".into(),
            is_guest: true,
            ..Default::default()
        };

        let identity = AuthIdentity::from(&resp);

        assert_eq!(identity.user_id, 42);
        assert_eq!(identity.nickname, "Guest42");
        assert_eq!(identity.gold, 100);
        assert_eq!(identity.diamond, 5);
        assert_eq!(identity.level, 3);
        assert_eq!(identity.experience, 250);
        assert_eq!(identity.connection_id, "conn-9");
        assert!(identity.is_guest);
    }
}
