//! [`GameSdk`]: the host-side orchestrator.
//!
//! Everything runs on the host's update loop. `tick_at` does, in order:
//!   1. apply results of background work (HTTP, denylist, avatars)
//!   2. poll the transport session
//!   3. poll the bots
//!   4. drain the chat filter
//!   5. release events that are no longer held back by filtering
//!   6. hand the released events to observers
//!
//! Background work is spawned into a `JoinSet` owned by the SDK, so dropping
//! the SDK cancels all of it. Results come back over a channel tagged with
//! the session generation that started them; results from a superseded
//! generation are discarded.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cinegame_bots::{BotConfig, BotEvent, BotHarness};
use cinegame_chat::{
    ChatPipeline, EmojiTable, FilterOrigin, FilteredChat, ProfanityFilter, load_filter,
};
use cinegame_protocol::{BackendId, ChatKind, CreateGameResponse, Payload};
use cinegame_room::{Participant, ParticipantDirectory, RoomConfig, Route, SendRoute};
use cinegame_session::{
    ConnectionState, GameTarget, SessionError, SessionEvent, TransportSession,
};
use cinegame_transport::RealtimeTransport;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::avatar::{self, mip_levels, resolve_avatar_url};
use crate::game::{self, GameResults, SessionInfo};
use crate::release::ReleaseQueue;
use crate::{
    AvatarFetcher, BackendApi, BackendError, CineGameError, ErrorKind, EventBus, GameEvent,
    GameObserver, SdkConfig, SubscriptionId,
};

/// Results of background work, applied during `tick_at`.
enum Background {
    GameCreated {
        generation: u64,
        response: CreateGameResponse,
    },
    /// Transient failures reached the alert threshold; retries continue.
    CreateEscalated {
        generation: u64,
        error: BackendError,
    },
    /// Refused for good; no more retries.
    CreateFailed {
        generation: u64,
        error: BackendError,
    },
    GameEndAcknowledged {
        code: String,
        attempts: u32,
    },
    AvatarFetched {
        generation: u64,
        id: BackendId,
        image: Vec<u8>,
    },
    FilterLoaded {
        filter: ProfanityFilter,
        origin: FilterOrigin,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Network,
    Bots,
}

/// What a chat-filter job was for.
enum ChatJob {
    JoinName(Participant),
    Line { from: BackendId, kind: ChatKind },
}

struct ChatTag {
    source: Source,
    seq: u64,
    job: ChatJob,
}

/// Drives one host through backend bootstrap, the realtime session, bots
/// and chat, and publishes a single [`GameEvent`] stream.
pub struct GameSdk<B, T> {
    config: SdkConfig,
    backend: Arc<B>,
    session: TransportSession<T>,
    directory: ParticipantDirectory,
    bots: Option<BotHarness>,
    chat: ChatPipeline<ChatTag>,
    filter_origin: Option<FilterOrigin>,
    /// Chat lines and join names submitted before the denylist resolved.
    held_chat: Vec<(ChatTag, String)>,
    bus: EventBus,
    tasks: JoinSet<()>,
    results_tx: mpsc::UnboundedSender<Background>,
    results_rx: mpsc::UnboundedReceiver<Background>,
    /// Bumped for every new session request and on shutdown.
    generation: Arc<AtomicU64>,
    active: Option<SessionInfo>,
    avatar_options: BTreeMap<String, String>,
    /// Game code → acknowledged by the backend.
    end_reports: BTreeMap<String, bool>,
    last_ended: Option<String>,
    network_events: ReleaseQueue,
    bot_events: ReleaseQueue,
    next_chat_seq: u64,
    outbox: Vec<GameEvent>,
}

impl<B, T> GameSdk<B, T>
where
    B: BackendApi + AvatarFetcher,
    T: RealtimeTransport,
{
    pub fn new(config: SdkConfig, backend: B, transport: T) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let session = TransportSession::new(transport, config.session.clone());
        Self {
            config,
            backend: Arc::new(backend),
            session,
            directory: ParticipantDirectory::new(),
            bots: None,
            chat: ChatPipeline::new(ProfanityFilter::disabled(), EmojiTable::new()),
            filter_origin: None,
            held_chat: Vec::new(),
            bus: EventBus::new(),
            tasks: JoinSet::new(),
            results_tx,
            results_rx,
            generation: Arc::new(AtomicU64::new(0)),
            active: None,
            avatar_options: BTreeMap::new(),
            end_reports: BTreeMap::new(),
            last_ended: None,
            network_events: ReleaseQueue::default(),
            bot_events: ReleaseQueue::default(),
            next_chat_seq: 0,
            outbox: Vec::new(),
        }
    }

    pub fn with_emojis(mut self, table: EmojiTable) -> Self {
        self.chat.set_emojis(table);
        self
    }

    pub fn subscribe(&mut self, observer: impl GameObserver + 'static) -> SubscriptionId {
        self.bus.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Loads the chat denylist and requests the first session code.
    ///
    /// Chat lines and join names are held until the denylist resolves, from
    /// the network, the cache, or as unavailable.
    pub fn start(&mut self) {
        self.load_chat_filter();
        self.request_session_code();
    }

    // -----------------------------------------------------------------------
    // Bootstrap
    // -----------------------------------------------------------------------

    /// Asks the backend for a new game session.
    ///
    /// Supersedes any request still in flight. Transient failures are
    /// retried every `create_retry_delay` without end; game logic hears
    /// about them once, at the `create_escalate_after`th failure. A 401 or
    /// other refusal ends the attempt with an error event. Chat stays held
    /// until [`start`](Self::start) has loaded the denylist.
    pub fn request_session_code(&mut self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request = self.config.create_request();
        let backend = Arc::clone(&self.backend);
        let current = Arc::clone(&self.generation);
        let tx = self.results_tx.clone();
        let delay = self.config.create_retry_delay;
        let escalate_after = self.config.create_escalate_after;
        info!(generation, game_type = %request.game_type, "requesting session code");

        self.spawn(async move {
            let mut failures = 0u32;
            loop {
                if current.load(Ordering::SeqCst) != generation {
                    debug!(generation, "session request superseded");
                    return;
                }
                match backend.create_game(&request).await {
                    Ok(response) => {
                        let _ = tx.send(Background::GameCreated {
                            generation,
                            response,
                        });
                        return;
                    }
                    Err(error) if error.is_transient() => {
                        failures += 1;
                        if failures == escalate_after {
                            error!(failures, %error, "create game keeps failing, still retrying");
                            let _ = tx.send(Background::CreateEscalated { generation, error });
                        } else {
                            warn!(failures, %error, "create game failed, retrying");
                        }
                        tokio::time::sleep(delay).await;
                    }
                    Err(error) => {
                        error!(%error, "create game refused");
                        let _ = tx.send(Background::CreateFailed { generation, error });
                        return;
                    }
                }
            }
        });
    }

    fn load_chat_filter(&mut self) {
        let source = self.config.denylist_source();
        let tx = self.results_tx.clone();
        self.spawn(async move {
            let (filter, origin) = load_filter(&source).await;
            let _ = tx.send(Background::FilterLoaded { filter, origin });
        });
    }

    fn on_game_created(&mut self, response: CreateGameResponse, now: Instant) {
        let info = SessionInfo::from_response(&response, self.config.max_players, now);
        info!(
            code = %info.code,
            server = %info.server,
            zone = %info.zone,
            secure = info.secure,
            "game created"
        );
        self.avatar_options = response.avatar_options.clone().unwrap_or_default();
        let lag = game::lag_config(&response).or_else(|| self.config.session.lag.clone());
        self.session.set_lag_config(lag);

        let room = RoomConfig::default()
            .with_game_type(self.config.game_type.clone())
            .with_host_id(self.config.host_name.clone())
            .with_test(self.config.is_test)
            .with_max_players(info.max_players)
            .with_supporters_per_player(response.max_supporters_per_player.unwrap_or(0));
        self.session.connect_and_create_game(
            GameTarget {
                server: info.server.clone(),
                session_code: info.code.clone(),
                zone: info.zone.clone(),
                secure: info.secure,
                room,
            },
            &mut self.directory,
        );

        self.restart_bots(now);
        self.active = Some(info.clone());
        self.outbox.push(GameEvent::SessionReady(info));
    }

    fn restart_bots(&mut self, now: Instant) {
        let stale: Vec<BackendId> = self.directory.bots().map(|(id, _)| id).collect();
        for id in stale {
            self.directory.remove(id);
            self.bot_events.push_ready(GameEvent::ParticipantLeft { id });
        }
        self.bots = None;
        if self.config.bots == 0 {
            return;
        }
        let mut bot_config = BotConfig::default().with_count(self.config.bots);
        bot_config.seed = self.config.bot_seed;
        self.bots = Some(BotHarness::new(bot_config, now));
    }

    // -----------------------------------------------------------------------
    // End of game
    // -----------------------------------------------------------------------

    /// Closes the room to new joins and reports the results.
    ///
    /// The report is retried every `end_retry_delay` until the backend
    /// acknowledges it, however long that takes. A later session does not
    /// cancel it; only dropping the SDK does.
    pub fn end_game(&mut self, results: GameResults) {
        let Some(active) = &self.active else {
            warn!("end_game without an active session");
            return;
        };
        let code = active.code.clone();
        if self.end_reports.contains_key(&code) {
            warn!(%code, "game already ended");
            return;
        }
        info!(%code, "ending game");
        if let Err(e) = self.session.stop_further_joins() {
            debug!(error = %e, "room not closed to joins");
        }
        self.session.log_lag_statistics();

        let request = results.into_request(code.clone());
        self.end_reports.insert(code.clone(), false);
        self.last_ended = Some(code.clone());

        let backend = Arc::clone(&self.backend);
        let tx = self.results_tx.clone();
        let delay = self.config.end_retry_delay;
        self.spawn(async move {
            let mut attempts = 0u32;
            loop {
                attempts += 1;
                match backend.end_game(&request).await {
                    Ok(()) => {
                        let _ = tx.send(Background::GameEndAcknowledged { code, attempts });
                        return;
                    }
                    Err(error) => {
                        warn!(%code, attempts, %error, "end-game report failed, retrying");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        });
    }

    /// Whether the backend acknowledged the most recently ended game.
    pub fn game_end_sent_to_server(&self) -> bool {
        self.last_ended
            .as_ref()
            .and_then(|code| self.end_reports.get(code))
            .copied()
            .unwrap_or(false)
    }

    /// Whether any ended game still waits for the backend's acknowledgement.
    pub fn has_unacknowledged_end(&self) -> bool {
        self.end_reports.values().any(|acknowledged| !acknowledged)
    }

    /// Disconnects and stops bots and pending session requests. Reports of
    /// ended games keep retrying until the SDK is dropped.
    pub fn shutdown(&mut self) {
        if self.has_unacknowledged_end() {
            warn!(
                pending = self.end_reports.values().filter(|ack| !**ack).count(),
                "shutting down before the backend acknowledged the game end"
            );
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.session.disconnect(&mut self.directory);
        self.bots = None;
        self.active = None;
        self.network_events.clear();
        self.bot_events.clear();
        self.held_chat.clear();
        info!("host shut down");
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Runs one host frame. See the module docs for the order of work.
    pub fn tick_at(&mut self, now: Instant) {
        self.reap_tasks();
        while let Ok(result) = self.results_rx.try_recv() {
            self.apply_background(result, now);
        }

        for event in self.session.poll(now, &mut self.directory) {
            self.on_session_event(event);
        }

        let bot_events = self
            .bots
            .as_mut()
            .map(|bots| bots.poll(now))
            .unwrap_or_default();
        for event in bot_events {
            self.on_bot_event(event);
        }

        let mut filtered = Vec::new();
        self.chat.drain(|result| filtered.push(result));
        for result in filtered {
            self.on_filtered(result);
        }

        self.network_events.release(&mut self.outbox);
        self.bot_events.release(&mut self.outbox);
        for event in std::mem::take(&mut self.outbox) {
            self.bus.dispatch(&event);
        }
    }

    fn reap_tasks(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                if e.is_panic() {
                    error!(error = %e, "background task panicked");
                }
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn apply_background(&mut self, result: Background, now: Instant) {
        match result {
            Background::GameCreated {
                generation,
                response,
            } => {
                if !self.is_current(generation) {
                    debug!(generation, code = %response.game_code, "stale session discarded");
                    return;
                }
                self.on_game_created(response, now);
            }
            Background::CreateEscalated { generation, error }
            | Background::CreateFailed { generation, error } => {
                if !self.is_current(generation) {
                    debug!(generation, %error, "stale session error discarded");
                    return;
                }
                self.outbox.push(GameEvent::Error {
                    kind: error.kind(),
                    code: error.code(),
                    message: error.to_string(),
                });
            }
            Background::GameEndAcknowledged { code, attempts } => {
                info!(%code, attempts, "game end acknowledged");
                self.end_reports.insert(code.clone(), true);
                self.outbox.push(GameEvent::GameEndAcknowledged { code });
            }
            Background::AvatarFetched {
                generation,
                id,
                image,
            } => {
                if !self.is_current(generation) || !self.directory.contains(id) {
                    debug!(%id, "avatar for departed participant discarded");
                    return;
                }
                let mip_levels = mip_levels(&image);
                self.outbox.push(GameEvent::AvatarUpdated {
                    id,
                    image,
                    mip_levels,
                });
            }
            Background::FilterLoaded { filter, origin } => {
                self.chat.set_filter(filter);
                self.filter_origin = Some(origin);
                let held = std::mem::take(&mut self.held_chat);
                if !held.is_empty() {
                    debug!(lines = held.len(), "releasing chat held for the denylist");
                }
                for (tag, text) in held {
                    self.chat.submit(tag, text);
                }
                if origin == FilterOrigin::Unavailable {
                    self.outbox.push(GameEvent::Error {
                        kind: ErrorKind::ChatFilterUnavailable,
                        code: 0,
                        message: "chat denylist unavailable, chat is unfiltered".to_string(),
                    });
                }
            }
        }
    }

    fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StateChanged { from, to } => {
                self.network_events
                    .push_ready(GameEvent::ConnectionStateChanged { from, to });
            }
            SessionEvent::RoomJoined { room } => {
                debug!(room = %room.name, users = room.users.len(), "room ready");
            }
            SessionEvent::Fatal { kind, message } => {
                self.network_events.push_ready(GameEvent::Error {
                    kind: kind.into(),
                    code: kind.code(),
                    message,
                });
            }
            SessionEvent::NeedNewSessionCode { conflict } => {
                warn!(?conflict, "session code conflict, requesting a new one");
                self.request_session_code();
            }
            SessionEvent::JoinRequested { handle, info } => {
                let participant = self
                    .directory
                    .get(info.backend_id)
                    .cloned()
                    .unwrap_or_else(|| Participant::from_join(&info));
                debug!(%handle, id = %participant.id, "filtering join");
                let name = participant.name.clone();
                self.submit_chat(Source::Network, name, ChatJob::JoinName(participant));
            }
            SessionEvent::ParticipantLeft { id } => {
                self.network_events
                    .push_ready(GameEvent::ParticipantLeft { id });
            }
            SessionEvent::ObjectMessage { from, payload } => {
                self.network_events
                    .push_ready(GameEvent::ObjectMessage { from, payload });
            }
            SessionEvent::PrivateMessage { from, text } => {
                self.network_events
                    .push_ready(GameEvent::PrivateMessage { from, text });
            }
            SessionEvent::Chat { from, kind, body } => {
                self.submit_chat(Source::Network, body, ChatJob::Line { from, kind });
            }
        }
    }

    fn on_bot_event(&mut self, event: BotEvent) {
        match event {
            BotEvent::Joined { handle, info } => {
                let participant = Participant::from_join(&info);
                match self.directory.insert(participant.clone(), Route::Bot(handle)) {
                    Ok(_) => {
                        let name = participant.name.clone();
                        self.submit_chat(Source::Bots, name, ChatJob::JoinName(participant));
                    }
                    Err(e) => warn!(%handle, error = %e, "could not register bot"),
                }
            }
            BotEvent::Left { id } => {
                if self.directory.remove(id).is_some() {
                    self.bot_events.push_ready(GameEvent::ParticipantLeft { id });
                } else {
                    debug!(%id, "duplicate bot leave dropped");
                }
            }
            BotEvent::AvatarChanged { id, avatar } => {
                let current = match self.directory.get(id) {
                    Some(p) => p.avatar.clone(),
                    None => {
                        debug!(%id, "avatar from absent bot dropped");
                        return;
                    }
                };
                if current.as_deref() == Some(avatar.as_str()) {
                    return;
                }
                if let Err(e) = self.directory.set_avatar(id, avatar.clone()) {
                    debug!(%id, error = %e, "avatar not recorded");
                }
                self.update_avatar(id, &avatar);
            }
            BotEvent::ObjectMessage { from, payload } => {
                if self.directory.contains(from) {
                    self.bot_events
                        .push_ready(GameEvent::ObjectMessage { from, payload });
                } else {
                    debug!(%from, "message from absent bot dropped");
                }
            }
            BotEvent::Chat { from, text } => {
                if self.directory.contains(from) {
                    let job = ChatJob::Line {
                        from,
                        kind: ChatKind::Text,
                    };
                    self.submit_chat(Source::Bots, text, job);
                } else {
                    debug!(%from, "chat from absent bot dropped");
                }
            }
        }
    }

    fn queue(&mut self, source: Source) -> &mut ReleaseQueue {
        match source {
            Source::Network => &mut self.network_events,
            Source::Bots => &mut self.bot_events,
        }
    }

    fn submit_chat(&mut self, source: Source, text: String, job: ChatJob) {
        self.next_chat_seq += 1;
        let seq = self.next_chat_seq;
        self.queue(source).push_waiting(seq);
        let tag = ChatTag { source, seq, job };
        if self.filter_origin.is_none() {
            self.held_chat.push((tag, text));
        } else {
            self.chat.submit(tag, text);
        }
    }

    fn on_filtered(&mut self, result: FilteredChat<ChatTag>) {
        let FilteredChat { tag, text, emojis } = result;
        let event = match tag.job {
            ChatJob::JoinName(mut participant) => {
                if self.directory.contains(participant.id) {
                    if let Err(e) = self.directory.set_name(participant.id, text.clone()) {
                        debug!(id = %participant.id, error = %e, "filtered name not recorded");
                    }
                }
                participant.name = text;
                info!(
                    id = %participant.id,
                    name = %participant.name,
                    role = ?participant.role,
                    "participant joined"
                );
                if let Some(avatar) = participant.avatar.clone() {
                    self.update_avatar(participant.id, &avatar);
                }
                GameEvent::ParticipantJoined(participant)
            }
            ChatJob::Line { from, kind } => GameEvent::Chat {
                from,
                kind,
                text,
                emojis,
            },
        };
        if !self.queue(tag.source).fill(tag.seq, event) {
            debug!(seq = tag.seq, "filtered text for a cleared queue dropped");
        }
    }

    // -----------------------------------------------------------------------
    // Avatars
    // -----------------------------------------------------------------------

    /// Resolves and downloads a participant's avatar. The image arrives as
    /// [`GameEvent::AvatarUpdated`]; rejected identifiers and failed
    /// downloads are logged and produce nothing.
    pub fn update_avatar(&mut self, id: BackendId, avatar: &str) {
        let url = match resolve_avatar_url(
            avatar,
            &self.avatar_options,
            &self.config.trusted_avatar_hosts,
        ) {
            Ok(url) => url,
            Err(e) => {
                error!(%id, error = %e, "avatar rejected");
                return;
            }
        };
        let generation = self.generation.load(Ordering::SeqCst);
        let backend = Arc::clone(&self.backend);
        let tx = self.results_tx.clone();
        let retries = self.config.avatar_retries;
        let delay = self.config.avatar_retry_delay;
        self.spawn(async move {
            match avatar::fetch_with_retry(backend.as_ref(), &url, retries, delay).await {
                Ok(image) => {
                    let _ = tx.send(Background::AvatarFetched {
                        generation,
                        id,
                        image,
                    });
                }
                Err(e) => error!(%id, %url, error = %e, "avatar download failed"),
            }
        });
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Sends `payload` to every network participant with one of the roles,
    /// and to every bot when players are included.
    pub fn broadcast(
        &mut self,
        payload: Payload,
        to_players: bool,
        to_spectators: bool,
    ) -> Result<(), CineGameError> {
        self.session.broadcast(payload.clone(), to_players, to_spectators)?;
        if to_players {
            if let Some(bots) = self.bots.as_mut() {
                bots.broadcast(&payload);
            }
        }
        Ok(())
    }

    /// Sends `payload` to one participant over whichever route reaches it.
    pub fn send_to_one(&mut self, id: BackendId, payload: Payload) -> Result<(), CineGameError> {
        match self.directory.resolve_for_send(id) {
            SendRoute::Bot(Some(handle)) => {
                let taken = self
                    .bots
                    .as_mut()
                    .is_some_and(|bots| bots.deliver(handle, &payload));
                if !taken {
                    debug!(%id, "bot did not take message");
                }
                Ok(())
            }
            SendRoute::Bot(None) => Err(SessionError::UnknownParticipant(id).into()),
            SendRoute::Network(_) => {
                self.session.send_to_one(&self.directory, id, payload)?;
                Ok(())
            }
        }
    }

    pub fn send_private_text(
        &mut self,
        id: BackendId,
        text: impl Into<String>,
    ) -> Result<(), CineGameError> {
        match self.directory.resolve_for_send(id) {
            SendRoute::Bot(Some(_)) => {
                debug!(%id, "bots ignore private text");
                Ok(())
            }
            SendRoute::Bot(None) => Err(SessionError::UnknownParticipant(id).into()),
            SendRoute::Network(_) => {
                self.session.send_private_text(&self.directory, id, text)?;
                Ok(())
            }
        }
    }

    /// Removes a participant from the room.
    pub fn kick(&mut self, id: BackendId) -> Result<(), CineGameError> {
        match self.directory.resolve_for_send(id) {
            SendRoute::Bot(Some(_)) => {
                self.directory.remove(id);
                self.bot_events.push_ready(GameEvent::ParticipantLeft { id });
                Ok(())
            }
            SendRoute::Bot(None) => Err(SessionError::UnknownParticipant(id).into()),
            SendRoute::Network(_) => {
                self.session.kick(&self.directory, id)?;
                Ok(())
            }
        }
    }

    pub fn stop_further_joins(&mut self) -> Result<(), CineGameError> {
        self.session.stop_further_joins()?;
        Ok(())
    }

    pub fn set_capacity(&mut self, max_players: u32, max_spectators: u32) -> Result<(), CineGameError> {
        self.session.set_capacity(max_players, max_spectators)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn active_session(&self) -> Option<&SessionInfo> {
        self.active.as_ref()
    }

    pub fn directory(&self) -> &ParticipantDirectory {
        &self.directory
    }

    pub fn transport_session(&self) -> &TransportSession<T> {
        &self.session
    }

    pub fn bots(&self) -> Option<&BotHarness> {
        self.bots.as_ref()
    }

    /// Where the chat denylist came from, once loading finished.
    pub fn chat_filter_origin(&self) -> Option<FilterOrigin> {
        self.filter_origin
    }

    /// Events held back behind chat lines still being filtered.
    pub fn held_events(&self) -> usize {
        self.network_events.waiting() + self.bot_events.waiting()
    }

    /// Current session generation. Changes with every session request.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match Handle::try_current() {
            Ok(handle) => {
                self.tasks.spawn_on(task, &handle);
            }
            Err(_) => error!("no tokio runtime, background task dropped"),
        }
    }
}
