//! Integration tests for the WebSocket client transport.
//!
//! These tests spin up a real WebSocket server on an OS-assigned port and
//! dial it with [`WebSocketConnector`], verifying that bytes flow in both
//! directions and that close and failure cases surface the right way.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use jigger_transport::{
        ByteSink, ByteStream, Connector, TransportError, WebSocketConnector,
    };
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Binds a listener on a random port and returns it with its `ws://` url.
    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have local addr");
        (listener, format!("ws://{addr}"))
    }

    async fn accept(listener: TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.expect("should accept");
        tokio_tungstenite::accept_async(stream)
            .await
            .expect("handshake should succeed")
    }

    #[tokio::test]
    async fn test_connect_send_and_receive() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(accept(listener));

        let (id, mut sink, mut stream) = WebSocketConnector
            .connect(&url)
            .await
            .expect("should connect");
        let mut server_ws = server.await.expect("task should complete");
        assert!(id.into_inner() > 0);

        // --- Client sends, server receives ---
        sink.send(b"hello from client").await.expect("send");
        let msg = server_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from client");

        // --- Server sends, client receives ---
        server_ws
            .send(Message::Binary(b"hello from server".to_vec().into()))
            .await
            .unwrap();
        let received = stream
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from server");
    }

    #[tokio::test]
    async fn test_text_messages_are_delivered_as_bytes() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(accept(listener));

        let (_, _sink, mut stream) =
            WebSocketConnector.connect(&url).await.expect("connect");
        let mut server_ws = server.await.unwrap();

        server_ws
            .send(Message::Text("plain text".into()))
            .await
            .unwrap();

        let received = stream.recv().await.unwrap().unwrap();
        assert_eq!(received, b"plain text");
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_server_close() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(accept(listener));

        let (_, _sink, mut stream) =
            WebSocketConnector.connect(&url).await.expect("connect");
        let mut server_ws = server.await.unwrap();

        server_ws.send(Message::Close(None)).await.unwrap();

        let result = stream.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on server close");
    }

    #[tokio::test]
    async fn test_each_connection_gets_a_new_id() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(async move {
            let first = accept_one(&listener).await;
            let second = accept_one(&listener).await;
            (first, second)
        });

        let (a, _, _) = WebSocketConnector.connect(&url).await.unwrap();
        let (b, _, _) = WebSocketConnector.connect(&url).await.unwrap();
        let _ = server.await.unwrap();

        assert_ne!(a, b);
        assert!(b > a, "ids should grow with every connection");
    }

    async fn accept_one(listener: &TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.expect("should accept");
        tokio_tungstenite::accept_async(stream).await.expect("handshake")
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        // Bind then drop, so the port is (almost certainly) closed.
        let (listener, url) = bind().await;
        drop(listener);

        let result = WebSocketConnector.connect(&url).await;

        assert!(
            matches!(result, Err(TransportError::ConnectFailed { .. })),
            "should report ConnectFailed"
        );
    }
}
