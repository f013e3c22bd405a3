use std::fmt;

use cinegame_protocol::{BackendId, JoinInfo, ParticipantKind, Role};
use serde::{Deserialize, Serialize};

/// Handle the bot harness uses to address one of its bots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotHandle(u32);

impl BotHandle {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn into_inner(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bot-{}", self.0)
    }
}

/// A player or spectator in the room, real or bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: BackendId,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub avatar: Option<String>,
    pub app_version: Option<String>,
    pub role: Role,
    /// The player this spectator supports.
    pub supporting_id: Option<BackendId>,
}

impl Participant {
    pub fn from_join(info: &JoinInfo) -> Self {
        Self {
            id: info.backend_id,
            name: info.name.clone(),
            age: info.age,
            gender: info.gender.clone(),
            avatar: info.avatar.clone(),
            app_version: info.app_version.clone(),
            role: info.role(),
            supporting_id: info.supporting_id,
        }
    }

    pub fn kind(&self) -> ParticipantKind {
        self.id.kind()
    }
}
