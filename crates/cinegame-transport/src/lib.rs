//! Realtime transport layer for the CineGame host SDK.
//!
//! The host talks to exactly one realtime game server over one connection.
//! [`RealtimeTransport`] abstracts that connection: every request returns
//! immediately, and everything the server (or the network) has to say comes
//! back as a [`TransportEvent`] from [`RealtimeTransport::poll_events`].
//! The session layer calls `poll_events` once per host tick, so all
//! transport events are handled on the host's logical thread.
//!
//! # Implementations
//!
//! - [`WebSocketTransport`] (feature `websocket`, default): real network I/O
//!   on a background tokio task, handed over through channels.
//! - [`MemoryTransport`]: in-process, with a scriptable [`MemoryServer`]
//!   on the other end. Used by tests and offline demos.

mod error;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use cinegame_protocol::ConnectionHandle;
pub use error::TransportError;
pub use memory::{MemoryServer, MemoryTransport};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;

use cinegame_protocol::{ClientFrame, ServerFrame};

/// Default port for plain WebSocket connections.
pub const DEFAULT_PORT: u16 = 8080;

/// Default port for TLS WebSocket connections.
pub const DEFAULT_SECURE_PORT: u16 = 8443;

// ---------------------------------------------------------------------------
// Connection parameters
// ---------------------------------------------------------------------------

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    pub host: String,
    pub port: u16,
    /// Zone to log in to once connected.
    pub zone: String,
    /// Use TLS (`wss://`).
    pub secure: bool,
}

impl ConnectConfig {
    /// Builds a config from the backend's `gameServer` value (`host` or
    /// `host:port`). A missing or unparsable port falls back to
    /// [`DEFAULT_PORT`] / [`DEFAULT_SECURE_PORT`].
    pub fn from_server(server: &str, zone: impl Into<String>, secure: bool) -> Self {
        let default_port = if secure { DEFAULT_SECURE_PORT } else { DEFAULT_PORT };
        let (host, port) = match server.rsplit_once(':') {
            Some((host, port)) => match port.parse() {
                Ok(port) => (host, port),
                Err(_) => (server, default_port),
            },
            None => (server, default_port),
        };
        Self {
            host: host.to_string(),
            port,
            zone: zone.into(),
            secure,
        }
    }

    /// The WebSocket URL for this config.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}:{}/websocket", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Why an established connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// We closed it.
    Manual,
    /// The server dropped us for inactivity.
    Idle,
    /// A moderator kicked us.
    Kick,
    /// A moderator banned us.
    Ban,
    /// Anything else: network failure, server shutdown, protocol error.
    Unknown(String),
}

impl DisconnectReason {
    /// Maps a close-frame reason string to a [`DisconnectReason`].
    pub fn from_close_reason(reason: &str) -> Self {
        match reason {
            "manual" => Self::Manual,
            "idle" => Self::Idle,
            "kick" => Self::Kick,
            "ban" => Self::Ban,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Whether this is a disconnect the session expects and should not
    /// report as an error.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Manual | Self::Idle)
    }
}

/// Something that happened on the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connect request succeeded.
    Connected,
    /// The connect request failed.
    ConnectFailed { reason: String },
    /// An established connection ended.
    ConnectionLost { reason: DisconnectReason },
    /// The server sent a frame.
    Frame(ServerFrame),
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// One client connection to the realtime game server.
///
/// No method blocks. Outcomes of [`connect`](Self::connect) and
/// [`send`](Self::send) arrive later through
/// [`poll_events`](Self::poll_events), which is the only way events leave
/// the transport.
pub trait RealtimeTransport: Send + 'static {
    /// Starts connecting. Any previous connection is dropped first and its
    /// undelivered events are discarded.
    ///
    /// # Errors
    /// Returns an error if the attempt could not even be started (e.g. no
    /// async runtime). Network failures are reported as
    /// [`TransportEvent::ConnectFailed`] instead.
    fn connect(&mut self, config: &ConnectConfig) -> Result<(), TransportError>;

    /// Queues a frame for the server.
    ///
    /// # Errors
    /// Returns [`TransportError::NotConnected`] when there is no open
    /// connection.
    fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError>;

    /// Drains every event received since the last call, in arrival order.
    fn poll_events(&mut self) -> Vec<TransportEvent>;

    /// Closes the connection. Does nothing if already closed.
    fn disconnect(&mut self);

    /// Whether a connection is currently open.
    fn is_connected(&self) -> bool;
}
