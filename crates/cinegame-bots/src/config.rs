//! Bot harness configuration.

use std::time::Duration;

use rand::Rng;

/// A closed range of delays sampled uniformly at millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub const fn from_millis(min: u64, max: u64) -> Self {
        Self::new(Duration::from_millis(min), Duration::from_millis(max))
    }

    /// A range that always yields `delay`.
    pub const fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let lo = self.min.as_millis() as u64;
        let hi = self.max.as_millis() as u64;
        Duration::from_millis(rng.random_range(lo..=hi))
    }
}

/// Rolls a probability, treating anything outside `[0, 1]` (and NaN) as
/// the nearest bound.
pub(crate) fn chance<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    if probability.is_nan() || probability <= 0.0 {
        return false;
    }
    rng.random_bool(probability.min(1.0))
}

/// How many bots to run and how they behave.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub count: usize,
    /// Wait before a bot first joins.
    pub join_delay: DelayRange,
    /// Wait between joining and setting an avatar.
    pub avatar_delay: DelayRange,
    /// Wait between actions while active.
    pub active_interval: DelayRange,
    /// Time spent away during a leave/rejoin.
    pub rejoin_delay: DelayRange,
    /// Chance per action that the bot leaves and later comes back.
    pub prob_leave_and_rejoin: f64,
    /// Chance per move that a chat line follows.
    pub prob_chat: f64,
    /// Wait between a move and the chat line that follows it.
    pub chat_delay: DelayRange,
    /// Chance that a move goes to the center instead of a random spot.
    pub prob_centered_move: f64,
    /// Chance that a bot answers a `ping` payload.
    pub ping_accept_probability: f64,
    /// When a bot comes back after leaving it announces a second leave
    /// rather than a join. Set to `false` to announce a join instead.
    pub repeat_leave_on_rejoin: bool,
    /// Fixed RNG seed. `None` seeds from the OS.
    pub seed: Option<u64>,
    pub names: Vec<String>,
    /// Logical avatar names.
    pub avatars: Vec<String>,
    pub chat_lines: Vec<String>,
}

const DEFAULT_NAMES: [&str; 12] = [
    "Alma", "Bo", "Carla", "Dino", "Edith", "Frej", "Gry", "Hugo", "Ida", "Jonas", "Karla",
    "Lasse",
];
const DEFAULT_AVATARS: [&str; 6] = ["fox", "owl", "bear", "cat", "frog", "whale"];
const DEFAULT_CHAT_LINES: [&str; 5] = ["hi!", "gg", "let's go", "so close", "again!"];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            count: 0,
            join_delay: DelayRange::from_millis(1_000, 10_000),
            avatar_delay: DelayRange::from_millis(500, 2_000),
            active_interval: DelayRange::from_millis(1_000, 4_000),
            rejoin_delay: DelayRange::from_millis(2_000, 6_000),
            prob_leave_and_rejoin: 0.01,
            prob_chat: 0.05,
            chat_delay: DelayRange::from_millis(500, 3_000),
            prob_centered_move: 0.2,
            ping_accept_probability: 0.7,
            repeat_leave_on_rejoin: true,
            seed: None,
            names: owned(&DEFAULT_NAMES),
            avatars: owned(&DEFAULT_AVATARS),
            chat_lines: owned(&DEFAULT_CHAT_LINES),
        }
    }
}

impl BotConfig {
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_join_delay(mut self, delay: DelayRange) -> Self {
        self.join_delay = delay;
        self
    }

    pub fn with_leave_probability(mut self, probability: f64) -> Self {
        self.prob_leave_and_rejoin = probability;
        self
    }

    pub fn with_chat_probability(mut self, probability: f64) -> Self {
        self.prob_chat = probability;
        self
    }

    pub fn with_ping_accept_probability(mut self, probability: f64) -> Self {
        self.ping_accept_probability = probability;
        self
    }

    pub fn with_repeat_leave_on_rejoin(mut self, repeat: bool) -> Self {
        self.repeat_leave_on_rejoin = repeat;
        self
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_bot_config_defaults() {
        let cfg = BotConfig::default();
        assert_eq!(cfg.join_delay, DelayRange::from_millis(1_000, 10_000));
        assert_eq!(cfg.rejoin_delay, DelayRange::from_millis(2_000, 6_000));
        assert_eq!(cfg.prob_leave_and_rejoin, 0.01);
        assert_eq!(cfg.ping_accept_probability, 0.7);
        assert!(cfg.repeat_leave_on_rejoin);
        assert!(cfg.seed.is_none());
        assert!(!cfg.names.is_empty());
    }

    #[test]
    fn test_delay_range_sample_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let range = DelayRange::from_millis(500, 2_000);
        for _ in 0..200 {
            let d = range.sample(&mut rng);
            assert!(d >= range.min && d <= range.max, "{d:?}");
        }
    }

    #[test]
    fn test_delay_range_inverted_yields_min() {
        let mut rng = StdRng::seed_from_u64(3);
        let range = DelayRange::from_millis(900, 100);
        assert_eq!(range.sample(&mut rng), Duration::from_millis(900));
        assert_eq!(
            DelayRange::fixed(Duration::from_secs(2)).sample(&mut rng),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_chance_clamps_out_of_range() {
        let mut rng = StdRng::seed_from_u64(9);
        assert!(chance(&mut rng, 1.5));
        assert!(!chance(&mut rng, -0.2));
        assert!(!chance(&mut rng, f64::NAN));
    }
}
