use cinegame_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No connection is open.
    #[error("not connected")]
    NotConnected,

    /// A connect attempt could not be started because no tokio runtime is
    /// running on this thread.
    #[error("no async runtime available")]
    NoRuntime,

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// A frame could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
