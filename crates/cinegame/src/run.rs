//! Host update loop.

use std::future::Future;

use cinegame_tick::FrameLoop;
use cinegame_transport::RealtimeTransport;
use tracing::info;

use crate::{AvatarFetcher, BackendApi, GameSdk};

/// Ticks `sdk` once per frame until `shutdown` resolves, then shuts it down.
///
/// Game logic that needs its own per-frame work can drive `tick_at` itself
/// instead; this is the loop for hosts that only react to events.
pub async fn run_host_loop<B, T, S>(sdk: &mut GameSdk<B, T>, mut frames: FrameLoop, shutdown: S)
where
    B: BackendApi + AvatarFetcher,
    T: RealtimeTransport,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    info!(rate_hz = frames.rate_hz(), "host loop started");
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            frame = frames.wait_for_frame() => sdk.tick_at(frame.now),
        }
    }
    info!(
        frames = frames.frame_count(),
        skipped = frames.total_skipped(),
        "host loop stopped"
    );
    sdk.shutdown();
}
