use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cinegame::bots::KEY_PING;
use cinegame::prelude::*;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Game state
// ---------------------------------------------------------------------------

/// Points per participant: one per move message.
#[derive(Default)]
struct Tally {
    points: BTreeMap<BackendId, i64>,
}

impl Tally {
    fn observe(&mut self, event: &GameEvent) {
        match event {
            GameEvent::SessionReady(info) => {
                info!(code = %info.code, "join with this code");
                self.points.clear();
            }
            GameEvent::ParticipantJoined(p) => {
                info!(id = %p.id, name = %p.name, role = ?p.role, "joined");
                self.points.entry(p.id).or_insert(0);
            }
            GameEvent::ParticipantLeft { id } => info!(%id, "left"),
            GameEvent::ObjectMessage { from, .. } => {
                *self.points.entry(*from).or_insert(0) += 1;
            }
            GameEvent::Chat { from, text, .. } => info!(%from, %text, "chat"),
            GameEvent::Error { kind, code, message } => {
                warn!(?kind, code, %message, "sdk error");
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), CineGameError> {
    cinegame::logging::init();

    let config = SdkConfig::from_env()?;
    let round = std::env::var("CINEGAME_DEMO_ROUND_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(120));

    let backend = HttpBackend::new(&config)?;
    let mut sdk = GameSdk::new(config, backend, WebSocketTransport::new());

    let tally = Arc::new(Mutex::new(Tally::default()));
    let observer = Arc::clone(&tally);
    sdk.subscribe(move |event: &GameEvent| {
        if let Ok(mut tally) = observer.lock() {
            tally.observe(event);
        }
    });
    sdk.start();

    let mut frames = FrameLoop::with_rate(30);
    let mut ping = tokio::time::interval(Duration::from_secs(5));
    let mut round_end = None;
    let mut ended: Option<String> = None;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            frame = frames.wait_for_frame() => {
                sdk.tick_at(frame.now);
                let active = sdk.active_session().map(|s| s.code.clone());
                if sdk.state() == ConnectionState::RoomJoined
                    && round_end.is_none()
                    && active != ended
                {
                    round_end = Some(frame.now + round);
                }
                if round_end.is_some_and(|end| frame.now >= end) {
                    let points = tally.lock().map(|t| t.points.clone()).unwrap_or_default();
                    info!(participants = points.len(), "round over");
                    sdk.end_game(GameResults {
                        points: Some(points),
                        ..Default::default()
                    });
                    round_end = None;
                    ended = active;
                }
            }
            _ = ping.tick() => {
                let payload = Payload::new().with(KEY_PING, 1);
                if let Err(e) = sdk.broadcast(payload, true, false) {
                    debug!(error = %e, "ping not sent");
                }
            }
        }
    }

    sdk.shutdown();
    Ok(())
}
