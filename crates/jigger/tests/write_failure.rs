//! Write failures, driven through an in-memory transport whose sink
//! breaks after a fixed number of sends.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jigger::prelude::*;
use jigger::protocol::{ClientId, FrameCodec, JsonCodec};
use jigger::transport::{ByteSink, ByteStream, ConnectionId, Connector};
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

// =========================================================================
// In-memory transport
// =========================================================================

/// Hands out connections whose sink accepts `ok_sends` chunks and then
/// fails with a broken pipe. Inbound chunks are pushed through `inbound`.
#[derive(Clone)]
struct BrittleConnector {
    ok_sends: usize,
    next_id: Arc<AtomicU64>,
    inbound: Arc<Mutex<Vec<mpsc::UnboundedSender<Vec<u8>>>>>,
}

impl BrittleConnector {
    fn new(ok_sends: usize) -> Self {
        Self {
            ok_sends,
            next_id: Arc::new(AtomicU64::new(1)),
            inbound: Arc::default(),
        }
    }

    /// Delivers `chunk` to the most recent connection's receive side.
    fn push(&self, chunk: Vec<u8>) {
        let inbound = self.inbound.lock().unwrap();
        inbound
            .last()
            .expect("a connection exists")
            .send(chunk)
            .expect("receive side open");
    }
}

struct BrittleSink {
    remaining: usize,
}

struct ChannelStream {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Connector for BrittleConnector {
    type Sink = BrittleSink;
    type Stream = ChannelStream;

    async fn connect(
        &self,
        _uri: &str,
    ) -> Result<(ConnectionId, BrittleSink, ChannelStream), TransportError> {
        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.inbound.lock().unwrap().push(tx);
        Ok((
            id,
            BrittleSink {
                remaining: self.ok_sends,
            },
            ChannelStream { rx },
        ))
    }
}

impl ByteSink for BrittleSink {
    async fn send(&mut self, _data: &[u8]) -> Result<(), TransportError> {
        if self.remaining == 0 {
            return Err(TransportError::SendFailed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "pipe broke",
            )));
        }
        self.remaining -= 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl ByteStream for ChannelStream {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn auth_response_frame(uid: u64) -> Vec<u8> {
    let payload = serde_json::to_vec(&AuthResponse {
        uid,
        nickname: format!("Guest{uid}"),
        is_guest: true,
        ..Default::default()
    })
    .expect("serializable");
    let envelope = Envelope {
        client_id: ClientId::new("server"),
        seq: 1,
        kind: MessageKind::AUTH_RESPONSE,
        payload,
    };
    FrameCodec::new(JsonCodec)
        .encode(&envelope)
        .expect("encodable")
}

/// Reads events until `Disconnected`, returning the state changes seen on
/// the way and the disconnect reason.
async fn states_until_disconnect(
    events: &mut ClientEvents,
) -> (Vec<ConnectionState>, DisconnectReason) {
    timeout(WAIT, async {
        let mut states = Vec::new();
        loop {
            match events.recv().await.expect("event stream open") {
                ClientEvent::StateChanged(state) => states.push(state),
                ClientEvent::Disconnected(reason) => return (states, reason),
                _ => {}
            }
        }
    })
    .await
    .expect("expected a disconnect in time")
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_failed_write_tears_down_connection_and_session() {
    let connector = BrittleConnector::new(1);
    let (client, mut events) = Client::builder(ClientConfig::default())
        .connector(connector.clone())
        .build();
    client.connect().await.expect("connect should succeed");

    client
        .authenticate(&client.auth_params("t1", "device-1", true))
        .await
        .expect("first send goes through");
    let mut auth = client.subscribe_auth();
    connector.push(auth_response_frame(7));
    timeout(WAIT, auth.wait_for(AuthState::is_authenticated))
        .await
        .expect("should authenticate in time")
        .expect("auth watch open");

    let result = client.draw_card(1).await;

    assert!(
        matches!(result, Err(ClientError::WriteFailed(TransportError::SendFailed(_)))),
        "got {result:?}"
    );
    let (states, reason) = states_until_disconnect(&mut events).await;
    assert_eq!(
        states,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Closing,
            ConnectionState::Disconnected,
        ]
    );
    assert!(
        matches!(reason, DisconnectReason::WriteFailed(ref msg) if msg.contains("pipe broke")),
        "got {reason:?}"
    );
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.auth_state(), AuthState::Idle);
    assert!(client.identity().is_none());
}

#[tokio::test]
async fn test_requests_after_write_failure_are_not_connected() {
    let connector = BrittleConnector::new(0);
    let (client, mut events) = Client::builder(ClientConfig::default())
        .connector(connector)
        .build();
    client.connect().await.expect("connect should succeed");

    let result = client
        .authenticate(&client.auth_params("t1", "device-1", true))
        .await;
    assert!(matches!(result, Err(ClientError::WriteFailed(_))), "got {result:?}");

    let (_, reason) = states_until_disconnect(&mut events).await;
    assert!(matches!(reason, DisconnectReason::WriteFailed(_)));
    assert_eq!(client.auth_state(), AuthState::Idle);
    assert!(matches!(
        client.authenticate(&client.auth_params("t1", "device-1", true)).await,
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn test_reconnect_after_write_failure_gets_a_fresh_connection() {
    let connector = BrittleConnector::new(0);
    let (client, mut events) = Client::builder(ClientConfig::default())
        .connector(connector.clone())
        .build();
    client.connect().await.expect("connect should succeed");
    let params = client.auth_params("t1", "device-1", true);
    assert!(client.authenticate(&params).await.is_err());
    states_until_disconnect(&mut events).await;

    client.connect().await.expect("reconnect should succeed");

    assert!(client.is_connected());
    assert_eq!(connector.inbound.lock().unwrap().len(), 2);
}
