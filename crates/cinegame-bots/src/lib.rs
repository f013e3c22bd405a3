//! Synthetic participants for exercising the CineGame host SDK without a
//! live backend.
//!
//! A [`BotHarness`] owns N [`LobbyBot`]s, each joining, moving, chatting
//! and occasionally leaving on its own randomized schedule. Everything a
//! bot reports comes out of [`BotHarness::poll`] as a [`BotEvent`] shaped
//! like the matching real-player traffic, so the host can merge both into
//! one event surface.
//!
//! Bots never run on their own: the host calls `poll` from its update loop.

mod bot;
mod config;
mod harness;

pub use bot::{BotEvent, KEY_PING, KEY_PONG, KEY_X, KEY_Y, LobbyBot};
pub use config::{BotConfig, DelayRange};
pub use harness::BotHarness;
