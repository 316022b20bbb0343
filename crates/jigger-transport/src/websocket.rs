//! WebSocket client transport using `tokio-tungstenite`.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::MaybeTlsStream;

use crate::{ByteSink, ByteStream, ConnectionId, Connector, TransportError};

/// Process-wide generation counter. Never hands out 0.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A [`Connector`] that dials `ws://` or `wss://` endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Sink = WebSocketSink;
    type Stream = WebSocketStream;

    async fn connect(
        &self,
        uri: &str,
    ) -> Result<(ConnectionId, WebSocketSink, WebSocketStream), TransportError> {
        let (ws, _response) =
            tokio_tungstenite::connect_async(uri).await.map_err(|e| {
                TransportError::ConnectFailed {
                    uri: uri.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        e,
                    ),
                }
            })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, uri, "WebSocket connection established");

        let (sink, stream) = ws.split();
        Ok((id, WebSocketSink { sink }, WebSocketStream { stream }))
    }
}

/// The write half of a WebSocket connection.
pub struct WebSocketSink {
    sink: SplitSink<WsStream, Message>,
}

impl ByteSink for WebSocketSink {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let msg = Message::Binary(data.to_vec().into());
        self.sink.send(msg).await.map_err(send_error)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close().await.map_err(send_error)
    }
}

fn send_error(e: WsError) -> TransportError {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            TransportError::ConnectionClosed(e.to_string())
        }
        other => TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            other,
        )),
    }
}

/// The read half of a WebSocket connection.
pub struct WebSocketStream {
    stream: SplitStream<WsStream>,
}

impl ByteStream for WebSocketStream {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                // Some servers push frames as text messages; the bytes are
                // still appended to the receive buffer as-is.
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }
}
