//! The client engine: one connection, one receive loop, one writer.
//!
//! ```text
//!   caller ──send_*()──→ [writer lock] ──frame──→ ByteSink ──→ server
//!                                                                │
//!   dispatcher ←── envelope ←── FrameCodec ←── buffer ←── ByteStream
//!        ↑                                     (receive loop task)
//!   AuthSession ←── AUTH_RESPONSE
//! ```
//!
//! Outbound frames are written under a single async mutex, so frames from
//! concurrent callers never interleave and sequence numbers are handed out
//! in write order. Inbound bytes are owned by one spawned task per
//! connection, which decodes and dispatches every complete frame before it
//! waits for more.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::BytesMut;
use jigger_protocol::catalog::{self, AuthParams};
use jigger_protocol::messages::{AuthResponse, GameAction, GameNotification};
use jigger_protocol::{
    ClientId, Codec, Envelope, FrameCodec, JsonCodec, LENGTH_PREFIX_LEN, Message, MessageKind,
    ProtocolError, SequenceCounter,
};
use jigger_session::{AuthIdentity, AuthOutcome, AuthSession, AuthState, PendingAuth};
use jigger_transport::{ByteSink, ByteStream, ConnectionId, Connector, WebSocketConnector};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::dispatcher::{Dispatch, MessageDispatcher};
use crate::events::{ClientEvent, ClientEvents, ConnectionState, DisconnectReason};
use crate::{ClientConfig, ClientError};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`Client`].
///
/// ```rust,no_run
/// use jigger::prelude::*;
///
/// # async fn run() -> Result<(), ClientError> {
/// let mut dispatcher = MessageDispatcher::new();
/// dispatcher.on(|resp: DrawCardResponse| {
///     println!("drew {} cards", resp.cards.len());
///     Ok(())
/// });
///
/// let (client, _events) = Client::builder(ClientConfig::default())
///     .dispatcher(dispatcher)
///     .build();
///
/// client.connect().await?;
/// let me = client.login(&client.auth_params("", "device-1", true)).await?;
/// println!("logged in as {}", me.nickname);
/// client.draw_card(1).await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder<C: Connector = WebSocketConnector> {
    config: ClientConfig,
    connector: C,
    dispatcher: MessageDispatcher,
    client_id: Option<ClientId>,
}

impl ClientBuilder<WebSocketConnector> {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connector: WebSocketConnector,
            dispatcher: MessageDispatcher::new(),
            client_id: None,
        }
    }
}

impl<C: Connector> ClientBuilder<C> {
    /// Replaces the transport.
    pub fn connector<D: Connector>(self, connector: D) -> ClientBuilder<D> {
        ClientBuilder {
            config: self.config,
            connector,
            dispatcher: self.dispatcher,
            client_id: self.client_id,
        }
    }

    /// Sets the handler table. It can't be changed after `build()`.
    pub fn dispatcher(mut self, dispatcher: MessageDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Uses a fixed client id instead of a random one.
    pub fn client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Builds the client and hands back its event stream.
    ///
    /// `max_buffer_len` is raised to fit one frame of `max_frame_len` plus
    /// its length prefix if it is configured smaller.
    pub fn build(mut self) -> (Client<C>, ClientEvents) {
        let min_buffer_len = self.config.max_frame_len.saturating_add(LENGTH_PREFIX_LEN);
        if self.config.max_buffer_len < min_buffer_len {
            tracing::warn!(
                max_buffer_len = self.config.max_buffer_len,
                max_frame_len = self.config.max_frame_len,
                "receive buffer can't hold a full frame, raising its limit"
            );
            self.config.max_buffer_len = min_buffer_len;
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (auth_tx, _) = watch::channel(AuthState::Idle);
        let frames = FrameCodec::new(JsonCodec).with_max_frame_len(self.config.max_frame_len);
        let client_id = self.client_id.unwrap_or_else(ClientId::generate);

        tracing::debug!(%client_id, endpoint = %self.config.endpoint, "client built");

        let shared = Shared {
            config: self.config,
            connector: self.connector,
            client_id,
            frames,
            dispatcher: self.dispatcher,
            session: Mutex::new(AuthSession::new()),
            state_tx,
            auth_tx,
            events_tx,
            writer: tokio::sync::Mutex::new(None),
            reader: Mutex::new(None),
            active: AtomicU64::new(0),
            lifecycle: tokio::sync::Mutex::new(()),
        };
        let shared = Arc::new(shared);
        let owner = Arc::new(Owner {
            shared: Arc::clone(&shared),
        });
        (Client { shared, _owner: owner }, events_rx)
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// The write half plus what is numbered per connection.
struct Writer<S> {
    sink: S,
    seq: SequenceCounter,
    conn_id: ConnectionId,
}

/// Handle on the running receive loop.
struct Reader {
    shutdown: oneshot::Sender<DisconnectReason>,
    task: JoinHandle<()>,
    conn_id: ConnectionId,
}

struct Shared<C: Connector> {
    config: ClientConfig,
    connector: C,
    client_id: ClientId,
    frames: FrameCodec<JsonCodec>,
    dispatcher: MessageDispatcher,
    session: Mutex<AuthSession>,
    state_tx: watch::Sender<ConnectionState>,
    auth_tx: watch::Sender<AuthState>,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
    /// The single writer lock. `None` while disconnected.
    writer: tokio::sync::Mutex<Option<Writer<C::Sink>>>,
    reader: Mutex<Option<Reader>>,
    /// Raw id of the connection currently owned, 0 for none. A receive
    /// loop whose id doesn't match is stale and must not touch anything.
    active: AtomicU64,
    /// Serializes `connect()` and `close()`.
    lifecycle: tokio::sync::Mutex<()>,
}

impl<C: Connector> Shared<C> {
    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let mut previous = next;
        let changed = self.state_tx.send_if_modified(|current| {
            previous = *current;
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            tracing::debug!(from = %previous, to = %next, "connection state changed");
            self.emit(ClientEvent::StateChanged(next));
        }
    }

    fn emit(&self, event: ClientEvent) {
        // The receiver may be gone; events are best-effort.
        let _ = self.events_tx.send(event);
    }

    /// Runs `f` on the session and publishes the resulting state.
    fn with_session<R>(&self, f: impl FnOnce(&mut AuthSession) -> R) -> R {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut session);
        self.auth_tx.send_if_modified(|published| {
            if published == session.state() {
                return false;
            }
            *published = session.state().clone();
            true
        });
        result
    }

    fn reader_slot(&self) -> MutexGuard<'_, Option<Reader>> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_active(&self, conn_id: ConnectionId) -> bool {
        self.active.load(Ordering::Acquire) == conn_id.into_inner()
    }

    /// Asks the receive loop of `conn_id` to stop with `reason`, without
    /// waiting for it.
    fn stop_reader(&self, conn_id: ConnectionId, reason: DisconnectReason) {
        let mut slot = self.reader_slot();
        if slot.as_ref().is_some_and(|r| r.conn_id == conn_id) {
            if let Some(reader) = slot.take() {
                let _ = reader.shutdown.send(reason);
            }
        }
    }

    // -- Receive side ------------------------------------------------------

    /// Appends an inbound chunk, refusing to hold more than
    /// `max_buffer_len` undecoded bytes.
    fn buffer_chunk(&self, buffer: &mut BytesMut, chunk: &[u8]) -> Result<(), DisconnectReason> {
        let len = buffer.len() + chunk.len();
        let max = self.config.max_buffer_len;
        if len > max {
            return Err(DisconnectReason::BufferOverflow { len, max });
        }
        buffer.extend_from_slice(chunk);
        Ok(())
    }

    /// Decodes and dispatches every complete frame in `buffer`.
    ///
    /// Returns the reason to drop the connection, if any.
    fn drain_frames(&self, buffer: &mut BytesMut) -> Result<(), DisconnectReason> {
        loop {
            match self.frames.decode(buffer) {
                Ok(Some(envelope)) => self.route(&envelope),
                Ok(None) => break,
                Err(ProtocolError::MalformedEnvelope { len, reason }) => {
                    tracing::warn!(len, %reason, "skipping malformed frame");
                    self.emit(ClientEvent::MalformedFrame { len, reason });
                }
                Err(ProtocolError::FrameTooLarge { len, max }) => {
                    return Err(DisconnectReason::FrameTooLarge { len, max });
                }
                Err(other) => return Err(DisconnectReason::ReadFailed(other.to_string())),
            }
        }
        Ok(())
    }

    fn route(&self, envelope: &Envelope) {
        tracing::trace!(
            kind = %envelope.kind,
            seq = envelope.seq,
            len = envelope.payload.len(),
            "received envelope"
        );

        if envelope.kind == MessageKind::AUTH_RESPONSE {
            self.on_auth_response(envelope);
        }

        match self.dispatcher.dispatch(envelope) {
            Dispatch::Handled | Dispatch::Unhandled => {}
            Dispatch::Failed(error) => self.emit(ClientEvent::DispatchFailed {
                kind: envelope.kind,
                seq: envelope.seq,
                error: error.to_string(),
            }),
        }
    }

    fn on_auth_response(&self, envelope: &Envelope) {
        let response: AuthResponse = match self.frames.codec().decode(&envelope.payload) {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(seq = envelope.seq, %error, "undecodable auth response");
                self.emit(ClientEvent::DispatchFailed {
                    kind: envelope.kind,
                    seq: envelope.seq,
                    error: error.to_string(),
                });
                return;
            }
        };

        match self.with_session(|session| session.on_response(&response)) {
            AuthOutcome::Authenticated(identity) => {
                self.emit(ClientEvent::Authenticated(identity));
            }
            AuthOutcome::Rejected { code, message } => {
                self.emit(ClientEvent::AuthFailed {
                    code: Some(code),
                    message,
                });
            }
            AuthOutcome::Ignored => {}
        }
    }

    /// Tears down after the receive loop of `conn_id` has stopped.
    async fn finish_connection(&self, conn_id: ConnectionId, reason: DisconnectReason) {
        if !self.is_active(conn_id) {
            tracing::debug!(%conn_id, %reason, "stale receive loop exited");
            return;
        }

        let writer = {
            let mut slot = self.writer.lock().await;
            if slot.as_ref().is_some_and(|w| w.conn_id == conn_id) {
                slot.take()
            } else {
                None
            }
        };
        if let Some(mut writer) = writer {
            if let Err(error) = writer.sink.close().await {
                tracing::debug!(%conn_id, %error, "close after receive loop exit failed");
            }
        }
        {
            let mut slot = self.reader_slot();
            if slot.as_ref().is_some_and(|r| r.conn_id == conn_id) {
                slot.take();
            }
        }

        self.active.store(0, Ordering::Release);
        self.with_session(AuthSession::reset);
        self.set_state(ConnectionState::Disconnected);

        if reason.is_error() {
            tracing::warn!(%conn_id, %reason, "connection lost");
        } else {
            tracing::info!(%conn_id, "connection closed");
        }
        self.emit(ClientEvent::Disconnected(reason));
    }
}

/// Reads chunks until shutdown, peer close, or a fatal error.
async fn receive_loop<C: Connector>(
    shared: Arc<Shared<C>>,
    mut stream: C::Stream,
    mut shutdown: oneshot::Receiver<DisconnectReason>,
    conn_id: ConnectionId,
) {
    let mut buffer = BytesMut::new();

    let reason = loop {
        let chunk = tokio::select! {
            reason = &mut shutdown => break reason.unwrap_or(DisconnectReason::Closed),
            chunk = stream.recv() => chunk,
        };

        match chunk {
            Ok(Some(bytes)) => {
                let drained = shared
                    .buffer_chunk(&mut buffer, &bytes)
                    .and_then(|()| shared.drain_frames(&mut buffer));
                if let Err(reason) = drained {
                    break reason;
                }
            }
            Ok(None) => break DisconnectReason::PeerClosed,
            Err(error) => break DisconnectReason::ReadFailed(error.to_string()),
        }
    };

    shared.finish_connection(conn_id, reason).await;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle on the client engine. Cheap to clone; clones share the same
/// connection.
///
/// Dropping the last handle stops the receive loop and closes the socket
/// in the background. Call [`close`](Self::close) to wait for that.
pub struct Client<C: Connector = WebSocketConnector> {
    shared: Arc<Shared<C>>,
    _owner: Arc<Owner<C>>,
}

impl<C: Connector> Clone for Client<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _owner: Arc::clone(&self._owner),
        }
    }
}

/// Shared by every `Client` handle but not by the receive loop, so it is
/// dropped exactly when the last handle goes away.
struct Owner<C: Connector> {
    shared: Arc<Shared<C>>,
}

impl<C: Connector> Drop for Owner<C> {
    fn drop(&mut self) {
        if let Some(reader) = self.shared.reader_slot().take() {
            tracing::debug!(conn_id = %reader.conn_id, "last client handle dropped, closing");
            let _ = reader.shutdown.send(DisconnectReason::Closed);
        }
    }
}

impl Client<WebSocketConnector> {
    /// Starts building a WebSocket client.
    pub fn builder(config: ClientConfig) -> ClientBuilder<WebSocketConnector> {
        ClientBuilder::new(config)
    }
}

impl<C: Connector> Client<C> {
    // -- Lifecycle ---------------------------------------------------------

    /// Opens the connection and starts the receive loop.
    ///
    /// Makes one attempt, bounded by the configured connect timeout.
    /// Sequence numbering restarts at 1 and any previous session state is
    /// discarded.
    ///
    /// # Errors
    /// - [`ClientError::AlreadyConnected`] unless currently disconnected.
    /// - [`ClientError::ConnectionFailed`] if the socket can't be opened.
    ///   The client is back in `Disconnected` and may try again.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let shared = &self.shared;
        let _lifecycle = shared.lifecycle.lock().await;
        if shared.state() != ConnectionState::Disconnected {
            return Err(ClientError::AlreadyConnected);
        }

        let endpoint = shared.config.endpoint.clone();
        shared.set_state(ConnectionState::Connecting);
        tracing::info!(%endpoint, "connecting");

        let timeout = shared.config.connect_timeout();
        let reason = match tokio::time::timeout(timeout, shared.connector.connect(&endpoint)).await
        {
            Ok(Ok((conn_id, sink, stream))) => {
                self.install(conn_id, sink, stream).await;
                tracing::info!(%endpoint, %conn_id, "connected");
                return Ok(());
            }
            Ok(Err(error)) => error.to_string(),
            Err(_) => format!("timed out after {timeout:?}"),
        };

        tracing::warn!(%endpoint, %reason, "connection failed");
        shared.set_state(ConnectionState::Disconnected);
        Err(ClientError::ConnectionFailed { endpoint, reason })
    }

    async fn install(&self, conn_id: ConnectionId, sink: C::Sink, stream: C::Stream) {
        let shared = &self.shared;
        shared.active.store(conn_id.into_inner(), Ordering::Release);
        shared.with_session(AuthSession::reset);
        *shared.writer.lock().await = Some(Writer {
            sink,
            seq: SequenceCounter::new(),
            conn_id,
        });
        shared.set_state(ConnectionState::Connected);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(receive_loop(
            Arc::clone(shared),
            stream,
            shutdown_rx,
            conn_id,
        ));
        *shared.reader_slot() = Some(Reader {
            shutdown: shutdown_tx,
            task,
            conn_id,
        });
    }

    /// Closes the connection and waits for the receive loop to stop.
    ///
    /// A send already holding the writer finishes first. Does nothing if
    /// there is no connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        let shared = &self.shared;
        let _lifecycle = shared.lifecycle.lock().await;

        let reader = shared.reader_slot().take();
        let writer = shared.writer.lock().await.take();
        if reader.is_none() && writer.is_none() {
            return Ok(());
        }
        shared.set_state(ConnectionState::Closing);

        // Stop the loop before the close handshake so the peer's reply
        // isn't reported as PeerClosed.
        let task = reader.map(|reader| {
            let _ = reader.shutdown.send(DisconnectReason::Closed);
            (reader.conn_id, reader.task)
        });
        if let Some(mut writer) = writer {
            if let Err(error) = writer.sink.close().await {
                tracing::debug!(conn_id = %writer.conn_id, %error, "close handshake failed");
            }
        }
        if let Some((conn_id, task)) = task {
            if let Err(error) = task.await {
                tracing::error!(%conn_id, %error, "receive loop task failed");
            }
        }

        // Normally the receive loop has already done this.
        shared.active.store(0, Ordering::Release);
        shared.with_session(AuthSession::reset);
        shared.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    // -- Observation -------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watches connection state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn auth_state(&self) -> AuthState {
        self.shared.auth_tx.borrow().clone()
    }

    /// Watches authentication state transitions.
    pub fn subscribe_auth(&self) -> watch::Receiver<AuthState> {
        self.shared.auth_tx.subscribe()
    }

    /// The logged-in identity, if the handshake has succeeded.
    pub fn identity(&self) -> Option<Arc<AuthIdentity>> {
        self.shared.with_session(|session| session.identity())
    }

    pub fn client_id(&self) -> &ClientId {
        &self.shared.client_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    // -- Authentication ----------------------------------------------------

    /// Auth parameters with this client's app id and device type filled in.
    pub fn auth_params(
        &self,
        token: impl Into<String>,
        device_id: impl Into<String>,
        is_guest: bool,
    ) -> AuthParams {
        let config = &self.shared.config;
        let params = if is_guest {
            AuthParams::guest(token, device_id, config.app_id.clone())
        } else {
            AuthParams::with_token(token, device_id, config.app_id.clone())
        };
        params.device_type(config.device_type.clone())
    }

    /// Sends AUTH_REQUEST and moves the session to `Authenticating`.
    ///
    /// Returns the request's sequence number. The outcome arrives later as
    /// a [`ClientEvent`] and on [`subscribe_auth`](Self::subscribe_auth);
    /// use [`login`](Self::login) to wait for it.
    ///
    /// # Errors
    /// - [`ClientError::NotConnected`] before `connect()` succeeds.
    /// - `InvalidRequest` for missing fields.
    /// - `AuthInProgress` if an earlier attempt is still outstanding.
    ///   Nothing is sent.
    pub async fn authenticate(&self, params: &AuthParams) -> Result<u64, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let request = catalog::auth_request(params)?;
        let pending = PendingAuth::new(request.nonce.clone(), request.is_guest);
        self.shared.with_session(|session| session.begin(pending))?;

        match self.write(&request).await {
            Ok(seq) => {
                tracing::info!(seq, is_guest = request.is_guest, "auth request sent");
                Ok(seq)
            }
            Err(error) => {
                self.shared.with_session(AuthSession::cancel);
                Err(error)
            }
        }
    }

    /// Authenticates and waits for the server's answer.
    ///
    /// # Errors
    /// Everything [`authenticate`](Self::authenticate) returns, plus:
    /// - `AuthRejected` with the server's code and message.
    /// - [`ClientError::AuthTimeout`] if no answer arrives in time; the
    ///   session is moved to `Failed`.
    /// - [`ClientError::NotConnected`] if the connection drops first.
    pub async fn login(&self, params: &AuthParams) -> Result<Arc<AuthIdentity>, ClientError> {
        self.authenticate(params).await?;

        let timeout = self.shared.config.auth_timeout();
        let mut auth = self.shared.auth_tx.subscribe();
        let settled = tokio::time::timeout(timeout, async {
            auth.wait_for(|state| !state.is_pending())
                .await
                .map(|state| (*state).clone())
        })
        .await;

        let state = match settled {
            Ok(Ok(state)) => state,
            Ok(Err(_)) => return Err(ClientError::NotConnected),
            Err(_) => {
                if self.shared.with_session(AuthSession::time_out) {
                    self.shared.emit(ClientEvent::AuthFailed {
                        code: None,
                        message: format!("no auth response within {timeout:?}"),
                    });
                    return Err(ClientError::AuthTimeout(timeout));
                }
                // The answer landed just as the timer fired.
                self.auth_state()
            }
        };

        match state {
            AuthState::Authenticated(identity) => Ok(identity),
            AuthState::Failed {
                code: Some(code),
                message,
            } => Err(jigger_session::SessionError::AuthRejected { code, message }.into()),
            AuthState::Failed { code: None, .. } => Err(ClientError::AuthTimeout(timeout)),
            AuthState::Idle | AuthState::Authenticating(_) => Err(ClientError::NotConnected),
        }
    }

    // -- Requests ----------------------------------------------------------

    /// Sends any typed message. Requires an authenticated session.
    ///
    /// Returns the envelope's sequence number.
    pub async fn send<M: Message>(&self, message: &M) -> Result<u64, ClientError> {
        self.require_ready()?;
        self.write(message).await
    }

    /// Sends a pre-serialized payload under `kind`. Requires an
    /// authenticated session.
    pub async fn send_raw(&self, kind: MessageKind, payload: Vec<u8>) -> Result<u64, ClientError> {
        self.require_ready()?;
        self.write_envelope(kind, payload).await
    }

    /// Asks for the logged-in user's profile and backpack.
    pub async fn get_user_info(&self) -> Result<u64, ClientError> {
        let me = self.require_ready()?;
        self.write(&catalog::get_user_info(me.user_id)?).await
    }

    /// Draws `count` cards for the logged-in user.
    pub async fn draw_card(&self, count: u32) -> Result<u64, ClientError> {
        let me = self.require_ready()?;
        self.write(&catalog::draw_card(me.user_id, count)?).await
    }

    pub async fn create_room(&self, name: &str) -> Result<u64, ClientError> {
        self.require_ready()?;
        self.write(&catalog::create_room(name)?).await
    }

    pub async fn join_room(&self, room_id: u64) -> Result<u64, ClientError> {
        self.require_ready()?;
        self.write(&catalog::join_room(room_id)?).await
    }

    pub async fn leave_room(&self) -> Result<u64, ClientError> {
        self.require_ready()?;
        self.write(&catalog::leave_room()).await
    }

    pub async fn game_action(&self, action: GameAction) -> Result<u64, ClientError> {
        self.require_ready()?;
        self.write(&catalog::game_action(action)?).await
    }

    /// Sends an informal GAME_ACTION_NOTIFICATION.
    pub async fn notify(&self, notification: &GameNotification) -> Result<u64, ClientError> {
        self.require_ready()?;
        self.write(notification).await
    }

    /// `NotConnected` first, then `NotAuthenticated`.
    fn require_ready(&self) -> Result<Arc<AuthIdentity>, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        Ok(self
            .shared
            .with_session(|session| session.require_authenticated())?)
    }

    // -- Send path ---------------------------------------------------------

    async fn write<M: Message>(&self, message: &M) -> Result<u64, ClientError> {
        let payload = self.shared.frames.codec().encode(message)?;
        self.write_envelope(M::KIND, payload).await
    }

    /// Frames and writes one envelope under the writer lock.
    ///
    /// The sequence number is only consumed once the frame has been
    /// built, so a rejected payload leaves no gap.
    async fn write_envelope(
        &self,
        kind: MessageKind,
        payload: Vec<u8>,
    ) -> Result<u64, ClientError> {
        let shared = &self.shared;
        let mut slot = shared.writer.lock().await;
        let Some(writer) = slot.as_mut() else {
            return Err(ClientError::NotConnected);
        };

        let envelope = Envelope {
            client_id: shared.client_id.clone(),
            seq: writer.seq.last() + 1,
            kind,
            payload,
        };
        let frame = shared.frames.encode(&envelope)?;
        let seq = writer.seq.next();

        match writer.sink.send(&frame).await {
            Ok(()) => {
                tracing::trace!(%kind, seq, len = frame.len(), "sent envelope");
                Ok(seq)
            }
            Err(error) => {
                let conn_id = writer.conn_id;
                slot.take();
                drop(slot);
                tracing::warn!(%conn_id, %kind, seq, %error, "write failed");
                shared.set_state(ConnectionState::Closing);
                shared.stop_reader(conn_id, DisconnectReason::WriteFailed(error.to_string()));
                Err(ClientError::WriteFailed(error))
            }
        }
    }
}

impl<C: Connector> std::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.shared.client_id)
            .field("endpoint", &self.shared.config.endpoint)
            .field("state", &self.state())
            .finish()
    }
}
