//! Room settings and participant bookkeeping for the CineGame host SDK.
//!
//! # Key types
//!
//! - [`RoomConfig`]: what the host's game room looks like when created
//! - [`Participant`]: one player or spectator, real or bot
//! - [`ParticipantDirectory`]: id → participant + route, and the
//!   outbound routing decision ([`ParticipantDirectory::resolve_for_send`])

mod config;
mod directory;
mod error;
mod participant;

pub use config::{RoomConfig, VAR_GAME_TYPE, VAR_HOST_ID, VAR_IS_TEST};
pub use directory::{ParticipantDirectory, Route, SendRoute};
pub use error::DirectoryError;
pub use participant::{BotHandle, Participant};
