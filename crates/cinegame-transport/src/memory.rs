//! In-process transport with a scriptable server side.
//!
//! [`MemoryTransport::pair`] returns the client half (handed to the session)
//! and a [`MemoryServer`] handle that plays the realtime server: it records
//! every client frame, can answer the connect/login/room handshake by itself,
//! and lets a test inject arbitrary server frames or drop the connection.
//! Events are delivered on the next [`RealtimeTransport::poll_events`],
//! never from inside the call that caused them.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cinegame_protocol::{
    ClientFrame, ConnectionHandle, Payload, RoomInfo, ServerFrame, UserInfo,
};
use tracing::debug;

use crate::{ConnectConfig, DisconnectReason, RealtimeTransport, TransportError, TransportEvent};

/// Handle the scripted server gives the host itself.
const HOST_HANDLE: u64 = 1;

#[derive(Debug, Default)]
struct ServerState {
    connected: bool,
    auto_accept: bool,
    fail_connects: u32,
    connect_attempts: u32,
    last_config: Option<ConnectConfig>,
    login_error: Option<(u16, String)>,
    room_error: Option<(u16, String)>,
    pending: VecDeque<TransportEvent>,
    received: Vec<ClientFrame>,
    next_user: u64,
    room_name: Option<String>,
}

impl ServerState {
    fn handle_frame(&mut self, frame: &ClientFrame) {
        if !self.auto_accept {
            return;
        }
        let reply = match frame {
            ClientFrame::Login { user_name, .. } => match self.login_error.take() {
                Some((code, message)) => ServerFrame::LoginError { code, message },
                None => ServerFrame::LoginOk {
                    user: UserInfo {
                        handle: ConnectionHandle::new(HOST_HANDLE),
                        name: user_name.clone(),
                        is_spectator: false,
                    },
                },
            },
            ClientFrame::CreateRoom { settings } => match self.room_error.take() {
                Some((code, message)) => ServerFrame::RoomCreateError { code, message },
                None => {
                    self.room_name = Some(settings.name.clone());
                    ServerFrame::RoomJoined {
                        room: RoomInfo {
                            id: 1,
                            name: settings.name.clone(),
                            max_users: settings.max_users,
                            max_spectators: settings.max_spectators,
                            users: Vec::new(),
                        },
                        moderator: true,
                    }
                }
            },
            ClientFrame::Ping { client_time } => ServerFrame::Pong {
                client_time: *client_time,
            },
            ClientFrame::Kick { user } => ServerFrame::UserExit { user: *user },
            _ => return,
        };
        self.pending.push_back(TransportEvent::Frame(reply));
    }
}

type Shared = Arc<Mutex<ServerState>>;

fn lock(state: &Shared) -> MutexGuard<'_, ServerState> {
    // A panicking test thread must not wedge the other half.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Client half
// ---------------------------------------------------------------------------

/// The client half of an in-memory connection.
pub struct MemoryTransport {
    state: Shared,
}

impl MemoryTransport {
    /// Creates a connected pair. The server half starts in auto-accept mode.
    pub fn pair() -> (Self, MemoryServer) {
        let state = Arc::new(Mutex::new(ServerState {
            auto_accept: true,
            next_user: HOST_HANDLE + 1,
            ..Default::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            MemoryServer { state },
        )
    }
}

impl RealtimeTransport for MemoryTransport {
    fn connect(&mut self, config: &ConnectConfig) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.connect_attempts += 1;
        state.last_config = Some(config.clone());
        state.connected = false;
        // A new connection discards whatever the old one left behind.
        state.pending.clear();
        state.room_name = None;

        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            state.pending.push_back(TransportEvent::ConnectFailed {
                reason: "connection refused".into(),
            });
        } else if state.auto_accept {
            state.connected = true;
            state.pending.push_back(TransportEvent::Connected);
        }
        debug!(attempt = state.connect_attempts, url = %config.url(), "memory connect");
        Ok(())
    }

    fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        state.handle_frame(&frame);
        state.received.push(frame);
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        lock(&self.state).pending.drain(..).collect()
    }

    fn disconnect(&mut self) {
        let mut state = lock(&self.state);
        state.connected = false;
        state.room_name = None;
    }

    fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }
}

// ---------------------------------------------------------------------------
// Server half
// ---------------------------------------------------------------------------

/// The scripted server end of a [`MemoryTransport`].
#[derive(Clone)]
pub struct MemoryServer {
    state: Shared,
}

impl MemoryServer {
    /// When on (the default), connects succeed immediately and login, room
    /// creation, pings and kicks are answered automatically.
    pub fn set_auto_accept(&self, on: bool) {
        lock(&self.state).auto_accept = on;
    }

    /// Makes the next `n` connect attempts fail.
    pub fn fail_next_connects(&self, n: u32) {
        lock(&self.state).fail_connects = n;
    }

    /// Answers the next login with a `LoginError`.
    pub fn reject_next_login(&self, code: u16, message: impl Into<String>) {
        lock(&self.state).login_error = Some((code, message.into()));
    }

    /// Answers the next room creation with a `RoomCreateError`.
    pub fn reject_next_room(&self, code: u16, message: impl Into<String>) {
        lock(&self.state).room_error = Some((code, message.into()));
    }

    /// Completes a pending connect by hand (auto-accept off).
    pub fn accept_connection(&self) {
        let mut state = lock(&self.state);
        state.connected = true;
        state.pending.push_back(TransportEvent::Connected);
    }

    /// Pushes a server frame to the client.
    pub fn inject(&self, frame: ServerFrame) {
        lock(&self.state)
            .pending
            .push_back(TransportEvent::Frame(frame));
    }

    /// Simulates a user entering the room. Returns the handle assigned.
    pub fn user_enter(&self, name: impl Into<String>, is_spectator: bool) -> ConnectionHandle {
        let mut state = lock(&self.state);
        let handle = ConnectionHandle::new(state.next_user);
        state.next_user += 1;
        state.pending.push_back(TransportEvent::Frame(ServerFrame::UserEnter {
            user: UserInfo {
                handle,
                name: name.into(),
                is_spectator,
            },
        }));
        handle
    }

    /// Simulates a user leaving the room.
    pub fn user_exit(&self, handle: ConnectionHandle) {
        self.inject(ServerFrame::UserExit { user: handle });
    }

    /// Simulates an object message from a user.
    pub fn object_message(&self, sender: ConnectionHandle, payload: Payload) {
        self.inject(ServerFrame::ObjectMessage { sender, payload });
    }

    /// Simulates a private text from a user.
    pub fn private_message(&self, sender: ConnectionHandle, text: impl Into<String>) {
        self.inject(ServerFrame::PrivateMessage {
            sender,
            text: text.into(),
        });
    }

    /// Ends the connection from the server side.
    pub fn drop_connection(&self, reason: DisconnectReason) {
        let mut state = lock(&self.state);
        state.connected = false;
        state.room_name = None;
        state.pending.push_back(TransportEvent::ConnectionLost { reason });
    }

    /// Every frame the client has sent so far.
    pub fn received(&self) -> Vec<ClientFrame> {
        lock(&self.state).received.clone()
    }

    /// Takes and clears the recorded client frames.
    pub fn take_received(&self) -> Vec<ClientFrame> {
        std::mem::take(&mut lock(&self.state).received)
    }

    /// How many times the client has called `connect`.
    pub fn connect_attempts(&self) -> u32 {
        lock(&self.state).connect_attempts
    }

    /// The parameters of the most recent connect.
    pub fn last_config(&self) -> Option<ConnectConfig> {
        lock(&self.state).last_config.clone()
    }

    /// Name of the room the client created on this connection, if any.
    pub fn room_name(&self) -> Option<String> {
        lock(&self.state).room_name.clone()
    }

    /// Whether the client side currently holds an open connection.
    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }
}
