//! Cooperative scheduling for the host's update loop.
//!
//! Nothing in the SDK runs on a timer of its own. The host process calls
//! `tick` once per frame and every periodic job (keep-alive, lag probes,
//! bot schedules, chat drain) checks the clock it is handed. This crate
//! provides the two pieces that make that work:
//!
//! - [`Interval`]: a repeating deadline polled with an explicit `now`.
//! - [`FrameLoop`]: a fixed-rate frame clock for the host loop itself, with
//!   overrun handling and pause/resume.
//!
//! ```ignore
//! let mut frames = FrameLoop::with_rate(30);
//! loop {
//!     tokio::select! {
//!         _ = &mut shutdown => break,
//!         frame = frames.wait_for_frame() => sdk.tick_at(frame.now),
//!     }
//! }
//! ```
//!
//! All instants are [`tokio::time::Instant`] so tests can run under
//! `tokio::time::pause()`.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Interval
// ---------------------------------------------------------------------------

/// A repeating deadline driven by the caller's clock.
///
/// [`poll`](Self::poll) fires at most once per call, however late it is
/// called, and re-arms one period after the time it fired. A host that
/// stalls for ten periods gets one keep-alive, not ten.
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    next: Instant,
}

impl Interval {
    /// First fire is one `period` after `start`.
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next: start + period,
        }
    }

    /// Like [`new`](Self::new) but due immediately.
    pub fn immediate(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next: start,
        }
    }

    /// Returns `true` if the deadline has passed, and re-arms from `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next = now + self.period;
        true
    }

    /// Pushes the next fire out to one period after `now`.
    pub fn reset(&mut self, now: Instant) {
        self.next = now + self.period;
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// When the next fire is due.
    pub fn deadline(&self) -> Instant {
        self.next
    }
}

// ---------------------------------------------------------------------------
// Frame loop configuration
// ---------------------------------------------------------------------------

/// What to do when the host falls behind the frame clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePolicy {
    /// Skip the missed frames and schedule the next one from now.
    #[default]
    Skip,
    /// Keep the original cadence; the next frame fires at its planned time
    /// even if that is immediately.
    Drop,
}

/// Configuration for a [`FrameLoop`].
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Frames per second.
    pub rate_hz: u32,
    /// Overrun handling policy.
    pub policy: FramePolicy,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            rate_hz: 30,
            policy: FramePolicy::default(),
        }
    }
}

impl FrameConfig {
    pub const MIN_RATE_HZ: u32 = 1;
    pub const MAX_RATE_HZ: u32 = 240;

    /// A config for a specific rate with default policy.
    pub fn with_rate(rate_hz: u32) -> Self {
        Self {
            rate_hz,
            ..Default::default()
        }
    }

    /// Clamps `rate_hz` into `MIN_RATE_HZ..=MAX_RATE_HZ`.
    ///
    /// Called by [`FrameLoop::new`]. A host loop always runs, so unlike a
    /// room tick there is no zero-rate mode.
    pub fn validated(mut self) -> Self {
        let clamped = self.rate_hz.clamp(Self::MIN_RATE_HZ, Self::MAX_RATE_HZ);
        if clamped != self.rate_hz {
            warn!(
                rate = self.rate_hz,
                clamped, "frame rate out of range, clamping"
            );
            self.rate_hz = clamped;
        }
        self
    }

    /// Duration of one frame.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.rate_hz.max(1)))
    }
}

/// Returned by [`FrameLoop::wait_for_frame`].
#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// When the frame fired. Pass this to `tick_at`.
    pub now: Instant,
    /// `true` if the frame fired noticeably late.
    pub overrun: bool,
    /// How many frames were skipped to catch up (0 normally).
    pub frames_skipped: u64,
}

// ---------------------------------------------------------------------------
// Frame loop
// ---------------------------------------------------------------------------

/// Fixed-rate frame clock for the host update loop.
pub struct FrameLoop {
    config: FrameConfig,
    frame_duration: Duration,
    frame_count: u64,
    next_frame: Instant,
    paused: bool,
    total_skipped: u64,
}

impl FrameLoop {
    pub fn new(config: FrameConfig) -> Self {
        let config = config.validated();
        let frame_duration = config.frame_duration();
        debug!(
            rate_hz = config.rate_hz,
            frame_ms = frame_duration.as_secs_f64() * 1000.0,
            policy = ?config.policy,
            "frame loop created"
        );
        Self {
            config,
            frame_duration,
            frame_count: 0,
            next_frame: Instant::now() + frame_duration,
            paused: false,
            total_skipped: 0,
        }
    }

    pub fn with_rate(rate_hz: u32) -> Self {
        Self::new(FrameConfig::with_rate(rate_hz))
    }

    /// Waits for the next frame.
    ///
    /// Pends forever while paused, so it composes with `tokio::select!`.
    pub async fn wait_for_frame(&mut self) -> FrameInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }
        let due = self.next_frame;
        time::sleep_until(due).await;

        let now = Instant::now();
        self.frame_count += 1;

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > self.frame_duration / 10;
        let mut frames_skipped = 0;

        self.next_frame = match self.config.policy {
            FramePolicy::Skip => {
                if overrun {
                    frames_skipped =
                        (late_by.as_nanos() / self.frame_duration.as_nanos()) as u64;
                    if frames_skipped > 0 {
                        warn!(
                            frame = self.frame_count,
                            skipped = frames_skipped,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "host loop overrun, skipping ahead"
                        );
                    }
                }
                now + self.frame_duration
            }
            FramePolicy::Drop => due + self.frame_duration,
        };
        self.total_skipped += frames_skipped;

        trace!(frame = self.frame_count, overrun, "frame");
        FrameInfo {
            frame: self.frame_count,
            now,
            overrun,
            frames_skipped,
        }
    }

    /// Stops frames until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(frame = self.frame_count, "frame loop paused");
        }
    }

    /// Restarts frames one period from now, without a burst for the time
    /// spent paused.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_frame = Instant::now() + self.frame_duration;
            debug!(frame = self.frame_count, "frame loop resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Total frames skipped by the `Skip` policy.
    pub fn total_skipped(&self) -> u64 {
        self.total_skipped
    }

    pub fn rate_hz(&self) -> u32 {
        self.config.rate_hz
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }
}
