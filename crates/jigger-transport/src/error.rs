/// Why a byte connection failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Dialing the endpoint failed; no connection exists.
    #[error("could not open {uri}: {source}")]
    ConnectFailed {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    /// The socket was already shut when we tried to use it.
    #[error("socket already closed: {0}")]
    ConnectionClosed(String),

    /// Writing a chunk failed.
    #[error("write to socket failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading the next chunk failed.
    #[error("read from socket failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
