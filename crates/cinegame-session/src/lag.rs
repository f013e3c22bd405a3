//! Round-trip lag sampling.

use std::collections::VecDeque;
use std::time::Duration;

use cinegame_tick::Interval;
use tokio::time::Instant;

use crate::LagConfig;

/// Snapshot of what the lag monitor has seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LagStats {
    /// Average of the most recent samples.
    pub current: Option<Duration>,
    /// Highest `current` seen this session.
    pub max: Duration,
    pub samples: u64,
}

/// Tracks current and maximum round-trip time from ping/pong pairs.
#[derive(Debug)]
pub struct LagMonitor {
    config: LagConfig,
    timer: Interval,
    window: VecDeque<Duration>,
    stats: LagStats,
}

impl LagMonitor {
    /// The first probe goes out immediately.
    pub fn new(config: LagConfig, now: Instant) -> Self {
        let timer = Interval::immediate(config.interval, now);
        Self {
            config,
            timer,
            window: VecDeque::new(),
            stats: LagStats::default(),
        }
    }

    /// Whether a probe is due.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.timer.poll(now)
    }

    pub fn record(&mut self, rtt: Duration) {
        let cap = self.config.samples.max(1) as usize;
        if self.window.len() == cap {
            self.window.pop_front();
        }
        self.window.push_back(rtt);

        let total: Duration = self.window.iter().sum();
        let current = total / self.window.len() as u32;
        self.stats.current = Some(current);
        self.stats.max = self.stats.max.max(current);
        self.stats.samples += 1;
    }

    pub fn stats(&self) -> LagStats {
        self.stats
    }

    pub fn warning_threshold(&self) -> Duration {
        self.config.warning_threshold
    }

    /// Whether the session's worst lag crossed the warning threshold.
    pub fn exceeded_threshold(&self) -> bool {
        self.stats.max > self.config.warning_threshold
    }
}
