//! Frames exchanged with the realtime game server.
//!
//! Every frame on the socket is an [`Envelope`]. Client frames are requests
//! the host issues (login, room creation, messages); server frames are the
//! responses and room traffic the server pushes back.

use serde::{Deserialize, Serialize};

use crate::{ConnectionHandle, Payload, Value};

/// Server error code: the user name is already logged in to the zone.
pub const ALREADY_LOGGED_IN: u16 = 6;

/// Server error code: a room with the requested name already exists.
pub const ROOM_NAME_TAKEN: u16 = 12;

// ---------------------------------------------------------------------------
// Room description
// ---------------------------------------------------------------------------

/// A named room variable, visible to every occupant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomVariable {
    pub name: String,
    pub value: Value,
}

/// What occupants (other than the owner) may change about a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPermissions {
    pub allow_resizing: bool,
    pub allow_name_change: bool,
    pub allow_password_state_change: bool,
    pub allow_public_messages: bool,
}

/// Everything the server needs to create a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSettings {
    pub name: String,
    pub is_game: bool,
    pub max_users: u32,
    pub max_spectators: u32,
    pub variables: Vec<RoomVariable>,
    pub permissions: RoomPermissions,
}

/// A user as the server describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub handle: ConnectionHandle,
    pub name: String,
    #[serde(default)]
    pub is_spectator: bool,
}

/// A room as the server describes it after a successful join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: u64,
    pub name: String,
    pub max_users: u32,
    pub max_spectators: u32,
    /// Occupants already present when we joined (excluding ourselves).
    #[serde(default)]
    pub users: Vec<UserInfo>,
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Who an object message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// Everyone in the room, filtered by role.
    Room { players: bool, spectators: bool },
    /// One user connection.
    User(ConnectionHandle),
}

/// Host → server requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    Login {
        user_name: String,
        zone: String,
    },
    /// Create a room and join it as its owner.
    CreateRoom {
        settings: RoomSettings,
    },
    ObjectMessage {
        target: Target,
        payload: Payload,
    },
    PrivateMessage {
        recipient: ConnectionHandle,
        text: String,
    },
    Kick {
        user: ConnectionHandle,
    },
    /// Lag probe. `client_time` is echoed back in [`ServerFrame::Pong`].
    Ping {
        client_time: u64,
    },
    /// Application-level no-op that resets the server's idle timer.
    KeepAlive,
    SetRoomCapacity {
        max_users: u32,
        max_spectators: u32,
    },
}

/// Server → host responses and room traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    LoginOk {
        user: UserInfo,
    },
    LoginError {
        code: u16,
        message: String,
    },
    RoomJoined {
        room: RoomInfo,
        /// `true` when the joining connection owns/moderates the room.
        moderator: bool,
    },
    RoomCreateError {
        code: u16,
        message: String,
    },
    UserEnter {
        user: UserInfo,
    },
    UserExit {
        user: ConnectionHandle,
    },
    ObjectMessage {
        sender: ConnectionHandle,
        payload: Payload,
    },
    PrivateMessage {
        sender: ConnectionHandle,
        text: String,
    },
    Pong {
        client_time: u64,
    },
    CapacityChangeError {
        code: u16,
        message: String,
    },
}

/// Direction-tagged frame body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dir", content = "frame")]
pub enum Frame {
    Client(ClientFrame),
    Server(ServerFrame),
}

/// The top-level wire wrapper. One envelope per socket message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender sequence number, starting at 1.
    pub seq: u64,
    /// Milliseconds since the sender opened the connection.
    pub timestamp: u64,
    pub frame: Frame,
}
