use cinegame_protocol::{BackendId, ChatKind, ConnectionHandle, JoinInfo, Payload, RoomInfo};

use crate::ConnectionState;

/// Fatal error from the connect sequence reported by the realtime server
/// collaborator. Each kind carries a negative sentinel code so it can share
/// one numeric error channel with HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Every connect attempt failed.
    ConnectFailed,
    /// An established connection dropped for a reason other than a manual
    /// close or idle timeout.
    ConnectionLost,
    /// Login was refused for a reason other than a name conflict.
    LoginFailed,
    /// Room creation was refused for a reason other than a name conflict.
    RoomCreateFailed,
}

pub const CONNECT_FAILED: i32 = -1;
pub const CONNECTION_LOST: i32 = -2;
pub const LOGIN_FAILED: i32 = -3;
pub const ROOM_CREATE_FAILED: i32 = -4;

impl FailureKind {
    pub fn code(self) -> i32 {
        match self {
            Self::ConnectFailed => CONNECT_FAILED,
            Self::ConnectionLost => CONNECTION_LOST,
            Self::LoginFailed => LOGIN_FAILED,
            Self::RoomCreateFailed => ROOM_CREATE_FAILED,
        }
    }
}

/// Which identity conflict the server reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// `"Host" + code` is already logged in somewhere.
    AlreadyLoggedIn,
    /// A room named after the code already exists.
    RoomExists,
}

/// What [`TransportSession::poll`](crate::TransportSession::poll) reports.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The connection state moved. Emitted for every transition.
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// The game room exists and the host is in it.
    RoomJoined { room: RoomInfo },
    /// The session can't continue. The owner decides whether to start over.
    Fatal { kind: FailureKind, message: String },
    /// The session code is taken; a fresh one is needed.
    NeedNewSessionCode { conflict: Conflict },
    /// A client announced itself. The participant is already mapped in the
    /// directory; its name has not been filtered yet.
    JoinRequested {
        handle: ConnectionHandle,
        info: JoinInfo,
    },
    /// A mapped participant left.
    ParticipantLeft { id: BackendId },
    /// Gameplay payload from a mapped participant.
    ObjectMessage { from: BackendId, payload: Payload },
    /// Private string message to the host.
    PrivateMessage { from: BackendId, text: String },
    /// Chat-channel text, not yet filtered.
    Chat {
        from: BackendId,
        kind: ChatKind,
        body: String,
    },
}
