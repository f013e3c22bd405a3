//! Shared fixtures: a scripted backend, an event recorder and a log capture.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cinegame::protocol::{CreateGameRequest, CreateGameResponse, EndGameRequest};
use cinegame::transport::{MemoryServer, MemoryTransport};
use cinegame::{AvatarFetcher, BackendApi, BackendError, GameEvent, GameSdk, SdkConfig};
use tokio::time::Instant;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Default)]
struct Script {
    creates: Mutex<VecDeque<Result<CreateGameResponse, BackendError>>>,
    create_calls: AtomicU32,
    end_calls: AtomicU32,
    ends_fail: AtomicBool,
    ended: Mutex<Vec<EndGameRequest>>,
    avatars: Mutex<Vec<String>>,
}

/// Backend that answers from a script. With nothing scripted, game creation
/// fails with a 503 and end-game reports succeed.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Script>,
}

impl ScriptedBackend {
    pub fn push_create(&self, result: Result<CreateGameResponse, BackendError>) {
        self.script.creates.lock().unwrap().push_back(result);
    }

    pub fn fail_ends(&self, on: bool) {
        self.script.ends_fail.store(on, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> u32 {
        self.script.create_calls.load(Ordering::SeqCst)
    }

    pub fn end_calls(&self) -> u32 {
        self.script.end_calls.load(Ordering::SeqCst)
    }

    pub fn ended(&self) -> Vec<EndGameRequest> {
        self.script.ended.lock().unwrap().clone()
    }

    pub fn avatar_urls(&self) -> Vec<String> {
        self.script.avatars.lock().unwrap().clone()
    }
}

impl BackendApi for ScriptedBackend {
    async fn create_game(
        &self,
        _request: &CreateGameRequest,
    ) -> Result<CreateGameResponse, BackendError> {
        self.script.create_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.creates.lock().unwrap().pop_front();
        next.unwrap_or(Err(BackendError::from_status(503)))
    }

    async fn end_game(&self, request: &EndGameRequest) -> Result<(), BackendError> {
        self.script.end_calls.fetch_add(1, Ordering::SeqCst);
        if self.script.ends_fail.load(Ordering::SeqCst) {
            return Err(BackendError::from_status(500));
        }
        self.script.ended.lock().unwrap().push(request.clone());
        Ok(())
    }
}

impl AvatarFetcher for ScriptedBackend {
    async fn fetch_avatar(&self, url: &str) -> Result<Vec<u8>, BackendError> {
        self.script.avatars.lock().unwrap().push(url.to_string());
        Ok(png(64, 32))
    }
}

/// A PNG signature and IHDR chunk, enough for the mip level count.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes
}

/// A create-game response as the backend sends it.
pub fn game_response(code: &str) -> CreateGameResponse {
    let body = serde_json::json!({
        "gameCode": code,
        "gameServer": "sfs.example.com",
        "gameZone": "Game",
        "webGlSecure": false,
        "maxSupportersPerPlayer": 2,
        "avatarOptions": { "fox": "https://cinegame.io/avatars/fox.png" },
    });
    serde_json::from_value(body).unwrap()
}

pub fn config() -> SdkConfig {
    SdkConfig::default()
        .with_game_type("quiz")
        .with_token("test-token")
}

pub type TestSdk = GameSdk<ScriptedBackend, MemoryTransport>;

/// Every event the SDK published, in order.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<GameEvent>>>,
}

impl Recorder {
    pub fn attach(sdk: &mut TestSdk) -> Self {
        let recorder = Self::default();
        let events = Arc::clone(&recorder.events);
        sdk.subscribe(move |event: &GameEvent| events.lock().unwrap().push(event.clone()));
        recorder
    }

    pub fn events(&self) -> Vec<GameEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<GameEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::Error { .. }))
            .collect()
    }

    pub fn sessions(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::SessionReady(info) => Some(info.code),
                _ => None,
            })
            .collect()
    }
}

pub fn sdk_with(config: SdkConfig) -> (TestSdk, ScriptedBackend, MemoryServer, Recorder) {
    let backend = ScriptedBackend::default();
    let (transport, server) = MemoryTransport::pair();
    let mut sdk = GameSdk::new(config, backend.clone(), transport);
    let recorder = Recorder::attach(&mut sdk);
    (sdk, backend, server, recorder)
}

pub fn sdk() -> (TestSdk, ScriptedBackend, MemoryServer, Recorder) {
    sdk_with(config())
}

/// Runs host frames of `step` for `total` of virtual time.
///
/// Chat filtering runs on blocking threads that the paused clock does not
/// wait for, so each frame also gives them a moment of real time while
/// events are held back.
pub async fn run_for(sdk: &mut TestSdk, total: Duration, step: Duration) {
    let end = Instant::now() + total;
    while Instant::now() < end {
        tokio::time::sleep(step).await;
        sdk.tick_at(Instant::now());
        settle_chat(sdk);
    }
}

/// Ticks until no event waits on the chat filter. Lines held for a
/// denylist that has not resolved yet are left alone.
pub fn settle_chat(sdk: &mut TestSdk) {
    if sdk.chat_filter_origin().is_none() {
        return;
    }
    for _ in 0..200 {
        if sdk.held_events() == 0 {
            return;
        }
        std::thread::sleep(Duration::from_millis(1));
        sdk.tick_at(Instant::now());
    }
}

/// Records the level and message of every event logged on this thread
/// while the guard from [`LogCapture::install`] is alive.
#[derive(Clone, Default)]
pub struct LogCapture {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl LogCapture {
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    /// Messages logged at `level` that start with `prefix`.
    pub fn count(&self, level: Level, prefix: &str) -> usize {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, message)| *l == level && message.starts_with(prefix))
            .count()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = MessageField::default();
        event.record(&mut message);
        self.lines
            .lock()
            .unwrap()
            .push((*event.metadata().level(), message.0));
    }
}

#[derive(Default)]
struct MessageField(String);

impl Visit for MessageField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}
