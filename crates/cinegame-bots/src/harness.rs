//! Runs a crowd of lobby bots and merges their events into one stream.

use cinegame_protocol::{BackendId, JoinInfo, Payload};
use cinegame_room::BotHandle;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::bot::{BotEvent, LobbyBot};
use crate::config::BotConfig;

const GENDERS: [&str; 2] = ["female", "male"];

/// Runs a set of [`LobbyBot`]s on one seeded RNG.
///
/// Bots get decreasing negative ids (`-1`, `-2`, ...) so they never collide
/// with backend-assigned player ids. Names and avatars are drawn without
/// replacement until a pool runs dry, then the pool is reshuffled.
pub struct BotHarness {
    config: BotConfig,
    rng: StdRng,
    bots: Vec<LobbyBot>,
}

impl BotHarness {
    pub fn new(config: BotConfig, now: Instant) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut names = ShuffledPool::new(config.names.clone());
        let mut avatars = ShuffledPool::new(config.avatars.clone());

        let mut bots = Vec::with_capacity(config.count);
        for index in 0..config.count {
            let info = JoinInfo {
                backend_id: BackendId(-(index as i64) - 1),
                name: names
                    .draw(&mut rng)
                    .unwrap_or_else(|| format!("Bot{}", index + 1)),
                age: rng.random_range(16..=70),
                gender: GENDERS.choose(&mut rng).copied().unwrap_or("female").to_string(),
                avatar: avatars.draw(&mut rng),
                app_version: Some(env!("CARGO_PKG_VERSION").to_string()),
                supporting_id: None,
            };
            let join_at = now + config.join_delay.sample(&mut rng);
            bots.push(LobbyBot::new(BotHandle::new(index as u32), info, join_at));
        }

        info!(count = config.count, seed = ?config.seed, "bot harness started");
        Self { config, rng, bots }
    }

    /// Advances every bot to `now` and returns what they did, in bot order.
    pub fn poll(&mut self, now: Instant) -> Vec<BotEvent> {
        let mut out = Vec::new();
        for bot in &mut self.bots {
            bot.poll(now, &mut self.rng, &self.config, &mut out);
        }
        out
    }

    /// Offers a payload to one bot. Returns whether the bot took it.
    pub fn deliver(&mut self, handle: BotHandle, payload: &Payload) -> bool {
        let Some(bot) = self.bots.get_mut(handle.into_inner() as usize) else {
            debug!(bot = %handle, "deliver to unknown bot");
            return false;
        };
        bot.deliver(payload, &mut self.rng, &self.config)
    }

    /// Offers a payload to every bot. Returns how many took it.
    pub fn broadcast(&mut self, payload: &Payload) -> usize {
        let mut accepted = 0;
        for bot in &mut self.bots {
            if bot.deliver(payload, &mut self.rng, &self.config) {
                accepted += 1;
            }
        }
        accepted
    }

    pub fn bots(&self) -> impl Iterator<Item = &LobbyBot> {
        self.bots.iter()
    }

    pub fn bot(&self, handle: BotHandle) -> Option<&LobbyBot> {
        self.bots.get(handle.into_inner() as usize)
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

/// Draws items in a random order without repeats until exhausted, then
/// starts over with a fresh shuffle.
struct ShuffledPool {
    items: Vec<String>,
    remaining: Vec<String>,
}

impl ShuffledPool {
    fn new(items: Vec<String>) -> Self {
        Self {
            items,
            remaining: Vec::new(),
        }
    }

    fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if self.remaining.is_empty() {
            self.remaining = self.items.clone();
            self.remaining.shuffle(rng);
        }
        self.remaining.pop()
    }
}
