//! Client configuration.

use std::time::Duration;

use jigger_protocol::DEFAULT_MAX_FRAME_LEN;
use jigger_protocol::catalog::DEFAULT_DEVICE_TYPE;
use serde::{Deserialize, Serialize};

/// Where the game server lives by default.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:18080/ws";

/// App id the desktop build identifies itself with.
pub const DEFAULT_APP_ID: &str = "desktop_app";

/// Settings for a [`Client`](crate::Client).
///
/// Every field has a default, so a config file only needs to name the
/// fields it changes:
///
/// ```rust
/// use jigger::ClientConfig;
///
/// let config: ClientConfig =
///     serde_json::from_str(r#"{ "endpoint": "ws://game.example:9000/ws" }"#).unwrap();
/// assert_eq!(config.app_id, "desktop_app");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the game server.
    pub endpoint: String,

    /// Sent as `app_id` in every auth request.
    pub app_id: String,

    /// Sent as `device_type` in every auth request.
    pub device_type: String,

    /// Largest envelope body accepted in either direction, in bytes.
    pub max_frame_len: usize,

    /// Largest amount of undecoded data the receive buffer may hold
    /// before the connection is dropped. Never less than one full frame:
    /// the builder raises it to `max_frame_len` plus the length prefix.
    pub max_buffer_len: usize,

    /// How long a single connection attempt may take.
    pub connect_timeout_ms: u64,

    /// How long [`Client::login`](crate::Client::login) waits for the
    /// auth response.
    pub auth_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            app_id: DEFAULT_APP_ID.to_string(),
            device_type: DEFAULT_DEVICE_TYPE.to_string(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_buffer_len: 2 * DEFAULT_MAX_FRAME_LEN,
            connect_timeout_ms: 5_000,
            auth_timeout_ms: 5_000,
        }
    }
}

impl ClientConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn with_max_buffer_len(mut self, max_buffer_len: usize) -> Self {
        self.max_buffer_len = max_buffer_len;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }
}
