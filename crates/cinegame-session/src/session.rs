//! The transport session: one connection, one login, one room.
//!
//! [`TransportSession`] is a poll-driven state machine. Requests
//! ([`connect_and_create_game`](TransportSession::connect_and_create_game),
//! the send operations) return immediately; their outcomes and everything
//! else the server says come out of [`poll`](TransportSession::poll) as
//! [`SessionEvent`]s. `poll` also runs the keep-alive and lag probes, so the
//! host must call it every frame.

use std::collections::HashMap;
use std::time::Duration;

use cinegame_protocol::{
    ALREADY_LOGGED_IN, BackendId, ClientFrame, ConnectionHandle, JoinInfo, ParticipantKind,
    Payload, PrivateText, ROOM_NAME_TAKEN, RoomInfo, ServerFrame, Target, UserInfo,
    classify_private_text,
};
use cinegame_room::{Participant, ParticipantDirectory, Route, SendRoute};
use cinegame_tick::Interval;
use cinegame_transport::{
    ConnectConfig, DisconnectReason, RealtimeTransport, TransportEvent,
};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    Conflict, ConnectionState, FailureKind, GameTarget, LagMonitor, LagStats, SessionConfig,
    SessionError, SessionEvent,
};

/// Drives one realtime connection through connect → login → room.
pub struct TransportSession<T> {
    transport: T,
    config: SessionConfig,
    state: ConnectionState,
    target: Option<GameTarget>,
    connect_attempts: u32,
    last_error: Option<String>,
    me: Option<UserInfo>,
    room: Option<RoomInfo>,
    moderator: bool,
    /// Room occupants other than the host, handle → is_spectator.
    occupants: HashMap<ConnectionHandle, bool>,
    keep_alive: Option<Interval>,
    lag: Option<LagMonitor>,
    unknown_sender_warnings: u32,
    epoch: Instant,
    events: Vec<SessionEvent>,
}

impl<T: RealtimeTransport> TransportSession<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: ConnectionState::Disconnected,
            target: None,
            connect_attempts: 0,
            last_error: None,
            me: None,
            room: None,
            moderator: false,
            occupants: HashMap::new(),
            keep_alive: None,
            lag: None,
            unknown_sender_warnings: 0,
            epoch: Instant::now(),
            events: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Connect sequence
    // -----------------------------------------------------------------------

    /// Connects, logs in as `"Host" + code` and creates the game room.
    ///
    /// When already logged in, goes straight to room creation. A room
    /// already joined is torn down first: its occupants are kicked and
    /// leave `directory`. When a connect is already in flight, the new
    /// target is picked up by the login that follows it.
    pub fn connect_and_create_game(
        &mut self,
        target: GameTarget,
        directory: &mut ParticipantDirectory,
    ) {
        info!(
            code = %target.session_code,
            server = %target.server,
            zone = %target.zone,
            secure = target.secure,
            state = %self.state,
            "starting game session"
        );
        self.target = Some(target);
        self.connect_attempts = 0;
        self.unknown_sender_warnings = 0;

        match self.state {
            ConnectionState::RoomJoined => {
                self.evict_room(directory);
                self.leave_room();
                self.set_state(ConnectionState::LoggedIn);
                self.create_room();
            }
            ConnectionState::LoggedIn => self.create_room(),
            ConnectionState::Connected => self.login(),
            ConnectionState::Connecting => {}
            ConnectionState::Disconnected
            | ConnectionState::ConnectionLost
            | ConnectionState::Failed => self.start_connect(),
        }
    }

    fn start_connect(&mut self) {
        let Some(target) = &self.target else {
            return;
        };
        let config = ConnectConfig::from_server(&target.server, &target.zone, target.secure);
        self.connect_attempts += 1;
        self.set_state(ConnectionState::Connecting);
        debug!(attempt = self.connect_attempts, url = %config.url(), "connecting");
        if let Err(e) = self.transport.connect(&config) {
            self.on_connect_failed(e.to_string());
        }
    }

    fn on_connect_failed(&mut self, reason: String) {
        self.last_error = Some(reason.clone());
        self.set_state(ConnectionState::Disconnected);

        if self.connect_attempts < self.config.max_connect_attempts {
            warn!(
                attempt = self.connect_attempts,
                max = self.config.max_connect_attempts,
                %reason,
                "connect failed, retrying"
            );
            self.start_connect();
        } else {
            error!(
                attempts = self.connect_attempts,
                %reason,
                "connect failed, giving up"
            );
            self.set_state(ConnectionState::Failed);
            self.events.push(SessionEvent::Fatal {
                kind: FailureKind::ConnectFailed,
                message: reason,
            });
        }
    }

    fn login(&mut self) {
        let Some(target) = &self.target else {
            return;
        };
        let frame = ClientFrame::Login {
            user_name: target.login_name(),
            zone: target.zone.clone(),
        };
        self.send_frame(frame);
    }

    fn create_room(&mut self) {
        let Some(target) = &self.target else {
            return;
        };
        let settings = target.room.settings(&target.session_code);
        debug!(room = %settings.name, max_users = settings.max_users, "creating room");
        self.send_frame(ClientFrame::CreateRoom { settings });
    }

    /// Kicks every other occupant when we moderate the room, so the server
    /// destroys it and frees its code, and drops network participants from
    /// `directory`.
    fn evict_room(&mut self, directory: &mut ParticipantDirectory) {
        if self.state == ConnectionState::RoomJoined && self.moderator {
            let handles: Vec<ConnectionHandle> = self.occupants.keys().copied().collect();
            info!(occupants = handles.len(), "evicting room");
            for user in handles {
                self.send_frame(ClientFrame::Kick { user });
            }
        }
        for id in directory.remove_all_network() {
            self.events.push(SessionEvent::ParticipantLeft { id });
        }
    }

    fn leave_room(&mut self) {
        self.room = None;
        self.moderator = false;
        self.occupants.clear();
    }

    // -----------------------------------------------------------------------
    // Poll
    // -----------------------------------------------------------------------

    /// Processes transport events and runs periodic jobs. Call once per
    /// host frame.
    ///
    /// `directory` receives the handle mapping of every participant that
    /// announces itself, and loses the ones that leave.
    pub fn poll(&mut self, now: Instant, directory: &mut ParticipantDirectory) -> Vec<SessionEvent> {
        for event in self.transport.poll_events() {
            self.handle_transport_event(event, now, directory);
        }

        if self.state.is_logged_in() {
            if self.keep_alive.as_mut().is_some_and(|k| k.poll(now)) {
                debug!("keep-alive");
                self.send_frame(ClientFrame::KeepAlive);
            }
            if self.lag.as_mut().is_some_and(|l| l.poll(now)) {
                let client_time = self.millis_since_epoch(now);
                self.send_frame(ClientFrame::Ping { client_time });
            }
        }

        std::mem::take(&mut self.events)
    }

    fn handle_transport_event(
        &mut self,
        event: TransportEvent,
        now: Instant,
        directory: &mut ParticipantDirectory,
    ) {
        match event {
            TransportEvent::Connected => {
                if self.state != ConnectionState::Connecting {
                    debug!(state = %self.state, "ignoring stale connect");
                    return;
                }
                self.set_state(ConnectionState::Connected);
                self.login();
            }
            TransportEvent::ConnectFailed { reason } => {
                if self.state != ConnectionState::Connecting {
                    debug!(state = %self.state, "ignoring stale connect failure");
                    return;
                }
                self.on_connect_failed(reason);
            }
            TransportEvent::ConnectionLost { reason } => {
                self.on_connection_lost(reason, directory);
            }
            TransportEvent::Frame(frame) => self.handle_frame(frame, now, directory),
        }
    }

    fn on_connection_lost(&mut self, reason: DisconnectReason, directory: &mut ParticipantDirectory) {
        if !self.state.is_connected() {
            debug!(state = %self.state, ?reason, "ignoring stale connection loss");
            return;
        }
        for id in directory.remove_all_network() {
            self.events.push(SessionEvent::ParticipantLeft { id });
        }
        self.leave_room();
        self.me = None;
        self.keep_alive = None;
        self.set_state(ConnectionState::ConnectionLost);

        if reason.is_expected() {
            info!(?reason, "connection closed");
        } else {
            let message = format!("connection lost: {reason:?}");
            error!(?reason, "connection lost");
            self.last_error = Some(message.clone());
            self.events.push(SessionEvent::Fatal {
                kind: FailureKind::ConnectionLost,
                message,
            });
        }
    }

    fn handle_frame(&mut self, frame: ServerFrame, now: Instant, directory: &mut ParticipantDirectory) {
        match frame {
            ServerFrame::LoginOk { user } => {
                if self.state != ConnectionState::Connected {
                    debug!(state = %self.state, "ignoring stale login");
                    return;
                }
                info!(user = %user.name, handle = %user.handle, "logged in");
                self.me = Some(user);
                self.set_state(ConnectionState::LoggedIn);
                self.keep_alive = Some(Interval::new(self.config.keep_alive_interval, now));
                self.lag = self.config.lag.clone().map(|cfg| LagMonitor::new(cfg, now));
                self.create_room();
            }
            ServerFrame::LoginError { code, message } => {
                if self.state != ConnectionState::Connected {
                    debug!(state = %self.state, code, "ignoring stale login error");
                    return;
                }
                self.last_error = Some(message.clone());
                if code == ALREADY_LOGGED_IN {
                    warn!(code, %message, "session code already logged in, need a new one");
                    self.events.push(SessionEvent::NeedNewSessionCode {
                        conflict: Conflict::AlreadyLoggedIn,
                    });
                } else {
                    error!(code, %message, "login failed");
                    self.transport.disconnect();
                    self.set_state(ConnectionState::Disconnected);
                    self.events.push(SessionEvent::Fatal {
                        kind: FailureKind::LoginFailed,
                        message,
                    });
                }
            }
            ServerFrame::RoomJoined { room, moderator } => {
                if self.state != ConnectionState::LoggedIn {
                    debug!(state = %self.state, room = %room.name, "ignoring stale room join");
                    return;
                }
                info!(room = %room.name, id = room.id, moderator, "room joined");
                self.occupants = room
                    .users
                    .iter()
                    .map(|u| (u.handle, u.is_spectator))
                    .collect();
                self.moderator = moderator;
                self.room = Some(room.clone());
                self.set_state(ConnectionState::RoomJoined);
                self.events.push(SessionEvent::RoomJoined { room });
            }
            ServerFrame::RoomCreateError { code, message } => {
                if self.state != ConnectionState::LoggedIn {
                    debug!(state = %self.state, code, "ignoring stale room error");
                    return;
                }
                self.last_error = Some(message.clone());
                if code == ROOM_NAME_TAKEN {
                    warn!(code, %message, "room already exists, need a new session code");
                    self.events.push(SessionEvent::NeedNewSessionCode {
                        conflict: Conflict::RoomExists,
                    });
                } else {
                    error!(code, %message, "room creation failed");
                    self.events.push(SessionEvent::Fatal {
                        kind: FailureKind::RoomCreateFailed,
                        message,
                    });
                }
            }
            ServerFrame::UserEnter { user } => {
                if self.in_room() {
                    debug!(handle = %user.handle, name = %user.name, "user entered");
                    self.occupants.insert(user.handle, user.is_spectator);
                }
            }
            ServerFrame::UserExit { user } => {
                self.occupants.remove(&user);
                if let Some(participant) = directory.remove_by_handle(user) {
                    info!(id = %participant.id, handle = %user, "participant left");
                    self.events
                        .push(SessionEvent::ParticipantLeft { id: participant.id });
                }
            }
            ServerFrame::ObjectMessage { sender, payload } => {
                self.on_object_message(sender, payload, directory);
            }
            ServerFrame::PrivateMessage { sender, text } => {
                let Some(from) = self.known_sender(sender, directory) else {
                    return;
                };
                self.events.push(match classify_private_text(&text) {
                    PrivateText::Chat { kind, body } => SessionEvent::Chat { from, kind, body },
                    PrivateText::Direct(text) => SessionEvent::PrivateMessage { from, text },
                });
            }
            ServerFrame::Pong { client_time } => {
                let rtt = self.millis_since_epoch(now).saturating_sub(client_time);
                if let Some(lag) = self.lag.as_mut() {
                    lag.record(Duration::from_millis(rtt));
                }
            }
            ServerFrame::CapacityChangeError { code, message } => {
                warn!(code, %message, "room capacity change refused");
            }
        }
    }

    /// First-contact payloads carry the client's identity; everything after
    /// that is gameplay.
    fn on_object_message(
        &mut self,
        sender: ConnectionHandle,
        payload: Payload,
        directory: &mut ParticipantDirectory,
    ) {
        if let Some(info) = JoinInfo::from_payload(&payload) {
            if info.backend_id.kind() == ParticipantKind::Bot {
                warn!(%sender, id = %info.backend_id, "network client claimed a bot id, ignoring");
                return;
            }
            let participant = Participant::from_join(&info);
            match directory.insert(participant, Route::Network(sender)) {
                Ok(previous) => {
                    debug!(id = %info.backend_id, %sender, rejoin = previous.is_some(), "join announced");
                    self.events.push(SessionEvent::JoinRequested {
                        handle: sender,
                        info,
                    });
                }
                Err(e) => warn!(%sender, error = %e, "could not register participant"),
            }
            return;
        }

        if let Some(from) = self.known_sender(sender, directory) {
            self.events.push(SessionEvent::ObjectMessage { from, payload });
        }
    }

    /// Maps a sender to its participant id, logging (with a cap) when the
    /// sender hasn't announced itself yet.
    fn known_sender(
        &mut self,
        sender: ConnectionHandle,
        directory: &ParticipantDirectory,
    ) -> Option<BackendId> {
        let id = directory.id_for_handle(sender);
        if id.is_none() {
            if self.unknown_sender_warnings < self.config.unknown_sender_log_limit {
                self.unknown_sender_warnings += 1;
                warn!(%sender, "message from unknown sender dropped");
            } else {
                debug!(%sender, "message from unknown sender dropped");
            }
        }
        id
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Sends `payload` to every network participant with one of the roles.
    /// Bots are not reached by this; the bot harness fans out separately.
    ///
    /// # Errors
    /// [`SessionError::NotInRoom`] outside `RoomJoined` (logged as a
    /// warning).
    pub fn broadcast(
        &mut self,
        payload: Payload,
        to_players: bool,
        to_spectators: bool,
    ) -> Result<(), SessionError> {
        self.require_room("broadcast")?;
        self.transport.send(ClientFrame::ObjectMessage {
            target: Target::Room {
                players: to_players,
                spectators: to_spectators,
            },
            payload,
        })?;
        Ok(())
    }

    /// Sends `payload` to one network participant.
    ///
    /// # Errors
    /// [`SessionError::NotInRoom`] outside `RoomJoined`,
    /// [`SessionError::BotParticipant`] for bot ids and
    /// [`SessionError::UnknownParticipant`] when no connection is mapped.
    pub fn send_to_one(
        &mut self,
        directory: &ParticipantDirectory,
        id: BackendId,
        payload: Payload,
    ) -> Result<(), SessionError> {
        self.require_room("send_to_one")?;
        let user = network_handle(directory, id)?;
        self.transport.send(ClientFrame::ObjectMessage {
            target: Target::User(user),
            payload,
        })?;
        Ok(())
    }

    /// Sends a private string message to one network participant.
    ///
    /// # Errors
    /// As [`send_to_one`](Self::send_to_one).
    pub fn send_private_text(
        &mut self,
        directory: &ParticipantDirectory,
        id: BackendId,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.require_room("send_private_text")?;
        let recipient = network_handle(directory, id)?;
        self.transport.send(ClientFrame::PrivateMessage {
            recipient,
            text: text.into(),
        })?;
        Ok(())
    }

    /// Removes a network participant from the room.
    ///
    /// # Errors
    /// As [`send_to_one`](Self::send_to_one).
    pub fn kick(&mut self, directory: &ParticipantDirectory, id: BackendId) -> Result<(), SessionError> {
        self.require_room("kick")?;
        let user = network_handle(directory, id)?;
        info!(%id, %user, "kicking participant");
        self.transport.send(ClientFrame::Kick { user })?;
        Ok(())
    }

    /// Clamps room capacity to the current occupancy so nobody else can join.
    ///
    /// # Errors
    /// [`SessionError::NotInRoom`] outside `RoomJoined`. A refusal by the
    /// server is only logged.
    pub fn stop_further_joins(&mut self) -> Result<(), SessionError> {
        let spectators = self.occupants.values().filter(|s| **s).count() as u32;
        let players = self.occupants.len() as u32 - spectators;
        info!(players, spectators, "closing room to further joins");
        self.set_capacity(players, spectators)
    }

    /// Requests new room capacities. Best effort: failures are logged, not
    /// retried.
    ///
    /// # Errors
    /// [`SessionError::NotInRoom`] outside `RoomJoined`.
    pub fn set_capacity(&mut self, max_players: u32, max_spectators: u32) -> Result<(), SessionError> {
        self.require_room("set_capacity")?;
        self.transport.send(ClientFrame::SetRoomCapacity {
            max_users: max_players,
            max_spectators,
        })?;
        Ok(())
    }

    /// Logs the lag monitor's findings; warns when the worst lag crossed the
    /// threshold.
    pub fn log_lag_statistics(&self) {
        let Some(lag) = &self.lag else {
            debug!("lag monitor disabled");
            return;
        };
        let stats = lag.stats();
        let max_ms = stats.max.as_millis() as u64;
        let threshold_ms = lag.warning_threshold().as_millis() as u64;
        if lag.exceeded_threshold() {
            warn!(max_ms, threshold_ms, samples = stats.samples, "session lag exceeded threshold");
        } else {
            info!(
                current_ms = stats.current.map(|d| d.as_millis() as u64),
                max_ms,
                samples = stats.samples,
                "session lag"
            );
        }
    }

    /// Closes the connection. Safe in every state.
    ///
    /// As room moderator, kicks every other occupant first so the server
    /// destroys the room and frees the session code.
    pub fn disconnect(&mut self, directory: &mut ParticipantDirectory) {
        self.evict_room(directory);
        self.transport.disconnect();
        self.leave_room();
        self.me = None;
        self.keep_alive = None;
        self.target = None;
        self.set_state(ConnectionState::Disconnected);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_moderator(&self) -> bool {
        self.moderator
    }

    pub fn room(&self) -> Option<&RoomInfo> {
        self.room.as_ref()
    }

    /// The server's view of the host connection, once logged in.
    pub fn me(&self) -> Option<&UserInfo> {
        self.me.as_ref()
    }

    pub fn session_code(&self) -> Option<&str> {
        self.target.as_ref().map(|t| t.session_code.as_str())
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// `(players, spectators)` currently in the room, excluding the host.
    pub fn occupancy(&self) -> (usize, usize) {
        let spectators = self.occupants.values().filter(|s| **s).count();
        (self.occupants.len() - spectators, spectators)
    }

    pub fn lag_stats(&self) -> Option<LagStats> {
        self.lag.as_ref().map(LagMonitor::stats)
    }

    /// Replaces the lag settings. Takes effect at the next login.
    pub fn set_lag_config(&mut self, lag: Option<crate::LagConfig>) {
        self.config.lag = lag;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn set_state(&mut self, to: ConnectionState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!(%from, %to, "connection state");
        self.state = to;
        self.events.push(SessionEvent::StateChanged { from, to });
    }

    fn in_room(&self) -> bool {
        self.state == ConnectionState::RoomJoined
    }

    fn require_room(&self, op: &'static str) -> Result<(), SessionError> {
        if self.in_room() {
            Ok(())
        } else {
            warn!(op, state = %self.state, "not in a room, ignoring");
            Err(SessionError::NotInRoom(self.state))
        }
    }

    /// Sends a control frame; failures are logged.
    fn send_frame(&mut self, frame: ClientFrame) {
        if let Err(e) = self.transport.send(frame) {
            warn!(error = %e, state = %self.state, "failed to send frame");
        }
    }

    fn millis_since_epoch(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.epoch).as_millis() as u64
    }
}

fn network_handle(
    directory: &ParticipantDirectory,
    id: BackendId,
) -> Result<ConnectionHandle, SessionError> {
    match directory.resolve_for_send(id) {
        SendRoute::Network(Some(handle)) => Ok(handle),
        SendRoute::Network(None) => Err(SessionError::UnknownParticipant(id)),
        SendRoute::Bot(_) => Err(SessionError::BotParticipant(id)),
    }
}
