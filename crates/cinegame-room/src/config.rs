//! Room configuration.

use cinegame_protocol::{RoomPermissions, RoomSettings, RoomVariable, Value};
use serde::{Deserialize, Serialize};

/// Room variable naming the kind of game being hosted.
pub const VAR_GAME_TYPE: &str = "GameType";
/// Room variable naming the host device.
pub const VAR_HOST_ID: &str = "HostId";
/// Room variable flagging test sessions. Only set when true.
pub const VAR_IS_TEST: &str = "IsTest";

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// How the host's game room is set up.
///
/// The room itself is always named after the session code, so the code is
/// passed separately to [`RoomConfig::settings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub game_type: String,
    pub host_id: String,
    pub is_test: bool,
    /// Maximum players in the room.
    pub max_players: u32,
    /// Maximum spectators across the whole room.
    pub max_spectators: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            game_type: String::new(),
            host_id: String::new(),
            is_test: false,
            max_players: 100,
            max_spectators: 0,
        }
    }
}

impl RoomConfig {
    pub fn with_game_type(mut self, game_type: impl Into<String>) -> Self {
        self.game_type = game_type.into();
        self
    }

    pub fn with_host_id(mut self, host_id: impl Into<String>) -> Self {
        self.host_id = host_id.into();
        self
    }

    pub fn with_test(mut self, is_test: bool) -> Self {
        self.is_test = is_test;
        self
    }

    pub fn with_max_players(mut self, max_players: u32) -> Self {
        self.max_players = max_players;
        self
    }

    /// Sizes the spectator capacity as `per_player × max_players`: each
    /// player may bring that many supporters.
    pub fn with_supporters_per_player(mut self, per_player: u32) -> Self {
        self.max_spectators = per_player.saturating_mul(self.max_players);
        self
    }

    /// The create-room request for a session.
    ///
    /// The host connection creates the room as a game room and therefore
    /// moderates it. Other occupants may resize it and toggle its password
    /// state, but not rename it.
    pub fn settings(&self, session_code: &str) -> RoomSettings {
        let mut variables = vec![
            RoomVariable {
                name: VAR_GAME_TYPE.into(),
                value: Value::Str(self.game_type.clone()),
            },
            RoomVariable {
                name: VAR_HOST_ID.into(),
                value: Value::Str(self.host_id.clone()),
            },
        ];
        if self.is_test {
            variables.push(RoomVariable {
                name: VAR_IS_TEST.into(),
                value: Value::Bool(true),
            });
        }
        RoomSettings {
            name: session_code.to_string(),
            is_game: true,
            max_users: self.max_players,
            max_spectators: self.max_spectators,
            variables,
            permissions: RoomPermissions {
                allow_resizing: true,
                allow_name_change: false,
                allow_password_state_change: true,
                allow_public_messages: true,
            },
        }
    }
}
