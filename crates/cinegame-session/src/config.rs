//! Session configuration and connection state.

use std::fmt;
use std::time::Duration;

use cinegame_room::RoomConfig;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Tunables for a [`TransportSession`](crate::TransportSession).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Connect attempts before giving up with a fatal error.
    pub max_connect_attempts: u32,
    /// How often to send an application-level keep-alive while logged in.
    /// The realtime server drops idle connections otherwise.
    pub keep_alive_interval: Duration,
    /// Round-trip sampling. `None` disables the lag monitor.
    pub lag: Option<LagConfig>,
    /// How many "message from unknown sender" warnings to log per session.
    /// Later ones go to debug.
    pub unknown_sender_log_limit: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_connect_attempts: 3,
            keep_alive_interval: Duration::from_secs(60),
            lag: None,
            unknown_sender_log_limit: 2,
        }
    }
}

impl SessionConfig {
    pub fn with_lag(mut self, lag: LagConfig) -> Self {
        self.lag = Some(lag);
        self
    }
}

/// Lag monitor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LagConfig {
    /// Time between probes.
    pub interval: Duration,
    /// Probes averaged into the "current" lag.
    pub samples: u32,
    /// A session whose maximum lag exceeds this is reported at the end.
    pub warning_threshold: Duration,
}

impl Default for LagConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(4),
            samples: 10,
            warning_threshold: Duration::from_millis(500),
        }
    }
}

// ---------------------------------------------------------------------------
// GameTarget
// ---------------------------------------------------------------------------

/// Where the game lives: everything the connect sequence needs from the
/// backend's create-game response.
#[derive(Debug, Clone)]
pub struct GameTarget {
    /// `host` or `host:port`.
    pub server: String,
    pub session_code: String,
    pub zone: String,
    pub secure: bool,
    pub room: RoomConfig,
}

impl GameTarget {
    /// The login name for this session.
    pub fn login_name(&self) -> String {
        format!("Host{}", self.session_code)
    }
}

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// The host connection's lifecycle.
///
/// ```text
///   Disconnected → Connecting → Connected → LoggedIn → RoomJoined
///        ↑             │                                  │
///        └─(retry)─────┘                                  ↓
///                      ↓                            ConnectionLost
///                   Failed
/// ```
///
/// - **Connecting**: a connect request is in flight. A failed attempt falls
///   back to `Disconnected` and is retried up to the attempt bound.
/// - **Failed**: the attempt bound was exhausted. Terminal until the next
///   `connect_and_create_game`.
/// - **ConnectionLost**: an established connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    LoggedIn,
    RoomJoined,
    ConnectionLost,
    Failed,
}

impl ConnectionState {
    /// Whether the transport link is up (whatever the login state).
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::LoggedIn | Self::RoomJoined)
    }

    /// Whether the host is logged in.
    pub fn is_logged_in(self) -> bool {
        matches!(self, Self::LoggedIn | Self::RoomJoined)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::LoggedIn => "LoggedIn",
            Self::RoomJoined => "RoomJoined",
            Self::ConnectionLost => "ConnectionLost",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}
