//! Integration tests for the host frame loop.
//!
//! Run under paused tokio time: `sleep_until` resolves as soon as the
//! runtime has nothing else to do, and `tokio::time::advance` simulates a
//! host that stalled.

use std::time::Duration;

use cinegame_tick::{FrameConfig, FrameLoop, FramePolicy};
use tokio::time::Instant;

// =========================================================================
// Basic cadence
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_frames_fire_at_configured_rate() {
    let start = Instant::now();
    let mut frames = FrameLoop::with_rate(20);

    let first = frames.wait_for_frame().await;
    assert_eq!(first.frame, 1);
    assert!(!first.overrun);
    assert_eq!(first.now - start, Duration::from_millis(50));

    let second = frames.wait_for_frame().await;
    assert_eq!(second.frame, 2);
    assert_eq!(second.now - start, Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_frame_count_tracks_frames() {
    let mut frames = FrameLoop::with_rate(60);
    for _ in 0..5 {
        frames.wait_for_frame().await;
    }
    assert_eq!(frames.frame_count(), 5);
}

// =========================================================================
// Overrun
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_skip_policy_skips_missed_frames() {
    let mut frames = FrameLoop::with_rate(10); // 100 ms
    // Host stalls for 350 ms before asking for the first frame.
    tokio::time::advance(Duration::from_millis(350)).await;

    let info = frames.wait_for_frame().await;
    assert!(info.overrun);
    assert_eq!(info.frames_skipped, 2);
    assert_eq!(frames.total_skipped(), 2);

    // Next frame is a full period after the late one.
    let next = frames.wait_for_frame().await;
    assert_eq!(next.now - info.now, Duration::from_millis(100));
    assert!(!next.overrun);
}

#[tokio::test(start_paused = true)]
async fn test_drop_policy_keeps_cadence() {
    let mut frames = FrameLoop::new(FrameConfig {
        rate_hz: 10,
        policy: FramePolicy::Drop,
    });
    let start = Instant::now();
    tokio::time::advance(Duration::from_millis(250)).await;

    let late = frames.wait_for_frame().await;
    assert!(late.overrun);
    assert_eq!(late.frames_skipped, 0);

    // Due at 200 ms, already past: fires without waiting.
    let catchup = frames.wait_for_frame().await;
    assert_eq!(catchup.now - start, Duration::from_millis(250));
}

// =========================================================================
// Pause / resume
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_paused_loop_never_fires() {
    let mut frames = FrameLoop::with_rate(30);
    frames.pause();
    assert!(frames.is_paused());

    let waited =
        tokio::time::timeout(Duration::from_secs(5), frames.wait_for_frame()).await;
    assert!(waited.is_err());
    assert_eq!(frames.frame_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_resume_restarts_one_period_later() {
    let mut frames = FrameLoop::with_rate(10);
    frames.pause();
    tokio::time::advance(Duration::from_secs(3)).await;
    frames.resume();

    let resumed_at = Instant::now();
    let info = frames.wait_for_frame().await;
    assert_eq!(info.now - resumed_at, Duration::from_millis(100));
    assert!(!info.overrun);
}
