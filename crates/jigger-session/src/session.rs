//! The authentication state machine.
//!
//! ```text
//!            begin()               on_response(ret == 0)
//!   Idle ──────────────→ Authenticating ──────────────────→ Authenticated
//!    ↑                        │  │
//!    │        cancel()        │  │  on_response(ret != 0) / time_out()
//!    └────────────────────────┘  └──────────────────────────→ Failed
//!
//!   reset() from any state → Idle   (connection lost or replaced)
//! ```
//!
//! `AuthSession` is plain data with no I/O and no locking. The client
//! engine owns one per connection behind a mutex and drives it from the
//! send path and the receive loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jigger_protocol::ErrorCode;
use jigger_protocol::messages::AuthResponse;

use crate::{AuthIdentity, SessionError};

// ---------------------------------------------------------------------------
// PendingAuth
// ---------------------------------------------------------------------------

/// What the session remembers between sending AUTH_REQUEST and receiving
/// AUTH_RESPONSE. Discarded as soon as the attempt resolves or the
/// connection goes away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuth {
    /// The nonce sent in the request, for log correlation.
    pub nonce: String,
    pub is_guest: bool,
    pub requested_at: Instant,
}

impl PendingAuth {
    pub fn new(nonce: impl Into<String>, is_guest: bool) -> Self {
        Self {
            nonce: nonce.into(),
            is_guest,
            requested_at: Instant::now(),
        }
    }

    /// How long the request has been outstanding.
    pub fn elapsed(&self) -> Duration {
        self.requested_at.elapsed()
    }
}

// ---------------------------------------------------------------------------
// AuthState
// ---------------------------------------------------------------------------

/// Where the handshake currently stands.
///
/// Cheap to clone, so the client can publish every transition on a
/// `watch` channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Nothing sent yet on this connection.
    #[default]
    Idle,

    /// AUTH_REQUEST sent, response outstanding.
    Authenticating(PendingAuth),

    /// The server accepted us.
    Authenticated(Arc<AuthIdentity>),

    /// The server rejected us, or gave up waiting.
    ///
    /// `code` is `None` when the failure was decided locally (timeout).
    Failed {
        code: Option<ErrorCode>,
        message: String,
    },
}

impl AuthState {
    /// Short lowercase name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Authenticating(_) => "authenticating",
            Self::Authenticated(_) => "authenticated",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Authenticating(_))
    }
}

/// What [`AuthSession::on_response`] did with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Arc<AuthIdentity>),
    Rejected { code: ErrorCode, message: String },
    /// No attempt was outstanding; the response was stale or duplicated.
    Ignored,
}

// ---------------------------------------------------------------------------
// AuthSession
// ---------------------------------------------------------------------------

/// One connection's handshake state.
#[derive(Debug, Default)]
pub struct AuthSession {
    state: AuthState,
}

impl AuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// The logged-in identity, if any.
    pub fn identity(&self) -> Option<Arc<AuthIdentity>> {
        match &self.state {
            AuthState::Authenticated(identity) => Some(Arc::clone(identity)),
            _ => None,
        }
    }

    /// Gate for every request other than AUTH_REQUEST.
    ///
    /// # Errors
    /// [`SessionError::NotAuthenticated`] unless the handshake succeeded.
    pub fn require_authenticated(&self) -> Result<Arc<AuthIdentity>, SessionError> {
        self.identity().ok_or(SessionError::NotAuthenticated)
    }

    /// Records that an AUTH_REQUEST is about to be sent.
    ///
    /// Allowed from `Idle`, `Failed`, and `Authenticated` (a fresh login
    /// replaces the old identity).
    ///
    /// # Errors
    /// [`SessionError::AuthInProgress`] if an attempt is already
    /// outstanding. The state is left untouched.
    pub fn begin(&mut self, pending: PendingAuth) -> Result<(), SessionError> {
        if self.state.is_pending() {
            return Err(SessionError::AuthInProgress);
        }
        tracing::debug!(
            nonce = %pending.nonce,
            is_guest = pending.is_guest,
            from = self.state.name(),
            "authentication started"
        );
        self.state = AuthState::Authenticating(pending);
        Ok(())
    }

    /// Applies an AUTH_RESPONSE.
    ///
    /// Only meaningful while `Authenticating`; otherwise the response is
    /// ignored and the state is unchanged.
    pub fn on_response(&mut self, resp: &AuthResponse) -> AuthOutcome {
        let AuthState::Authenticating(pending) = &self.state else {
            tracing::debug!(
                state = self.state.name(),
                uid = resp.uid,
                "ignoring auth response with no attempt outstanding"
            );
            return AuthOutcome::Ignored;
        };

        if resp.ret.is_ok() {
            let identity = Arc::new(AuthIdentity::from(resp));
            tracing::info!(
                user_id = identity.user_id,
                nickname = %identity.nickname,
                is_guest = identity.is_guest,
                elapsed_ms = pending.elapsed().as_millis() as u64,
                "authenticated"
            );
            self.state = AuthState::Authenticated(Arc::clone(&identity));
            AuthOutcome::Authenticated(identity)
        } else {
            tracing::warn!(
                code = resp.ret.0,
                message = %resp.error_msg,
                "authentication rejected"
            );
            self.state = AuthState::Failed {
                code: Some(resp.ret),
                message: resp.error_msg.clone(),
            };
            AuthOutcome::Rejected {
                code: resp.ret,
                message: resp.error_msg.clone(),
            }
        }
    }

    /// Gives up on the outstanding attempt: `Authenticating` → `Failed`.
    ///
    /// Returns `false` (and changes nothing) if no attempt is outstanding,
    /// e.g. because the response won the race.
    pub fn time_out(&mut self) -> bool {
        let AuthState::Authenticating(pending) = &self.state else {
            return false;
        };
        tracing::warn!(
            nonce = %pending.nonce,
            elapsed_ms = pending.elapsed().as_millis() as u64,
            "authentication timed out"
        );
        self.state = AuthState::Failed {
            code: None,
            message: "no auth response before the deadline".to_string(),
        };
        true
    }

    /// Withdraws an attempt whose request never made it onto the wire:
    /// `Authenticating` → `Idle`. No-op in any other state.
    pub fn cancel(&mut self) {
        if self.state.is_pending() {
            tracing::debug!("authentication cancelled before send");
            self.state = AuthState::Idle;
        }
    }

    /// Forgets everything: back to `Idle`.
    ///
    /// Called when the connection is lost or replaced. Any pending
    /// attempt and any identity are dropped.
    pub fn reset(&mut self) {
        if !matches!(self.state, AuthState::Idle) {
            tracing::debug!(from = self.state.name(), "session reset");
        }
        self.state = AuthState::Idle;
    }
}
