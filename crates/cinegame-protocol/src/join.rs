//! Player-facing message shapes: the identity payload a client sends on
//! first contact, and the convention that splits private text into chat
//! and direct messages.

use crate::{BackendId, Payload, Role};

/// Payload key carrying the participant's backend id.
pub const KEY_BACKEND_ID: &str = "bkid";
const KEY_NAME: &str = "name";
const KEY_AGE: &str = "age";
const KEY_GENDER: &str = "gender";
const KEY_AVATAR: &str = "avatar";
const KEY_APP_VERSION: &str = "appVer";
const KEY_SUPPORTING_ID: &str = "supportingId";

/// Identity fields a participant announces when it first talks to the host.
///
/// Real clients send this as an object message right after entering the
/// room; bots produce the same shape so game logic can't tell them apart.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinInfo {
    pub backend_id: BackendId,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub avatar: Option<String>,
    /// Client app version (semver string), absent for old clients.
    pub app_version: Option<String>,
    /// For spectators, the player they support.
    pub supporting_id: Option<BackendId>,
}

impl JoinInfo {
    /// Parses a first-contact payload.
    ///
    /// Returns `None` when `bkid` is missing: the payload is then an ordinary
    /// gameplay message, not an identity announcement.
    pub fn from_payload(payload: &Payload) -> Option<Self> {
        let backend_id = BackendId(i64::from(payload.get_int(KEY_BACKEND_ID)?));
        Some(Self {
            backend_id,
            name: payload.get_str(KEY_NAME).unwrap_or_default().to_string(),
            age: payload.get_int(KEY_AGE).unwrap_or_default(),
            gender: payload.get_str(KEY_GENDER).unwrap_or_default().to_string(),
            avatar: payload.get_str(KEY_AVATAR).map(str::to_string),
            app_version: payload.get_str(KEY_APP_VERSION).map(str::to_string),
            supporting_id: payload
                .get_int(KEY_SUPPORTING_ID)
                .map(|id| BackendId(i64::from(id))),
        })
    }

    /// Encodes the announcement the way a client would send it.
    pub fn to_payload(&self) -> Payload {
        // Wire ints are 32-bit; ids outside that range never come from the backend.
        let mut payload = Payload::new()
            .with(KEY_BACKEND_ID, self.backend_id.0 as i32)
            .with(KEY_NAME, self.name.as_str())
            .with(KEY_AGE, self.age)
            .with(KEY_GENDER, self.gender.as_str());
        if let Some(avatar) = &self.avatar {
            payload.insert(KEY_AVATAR, avatar.as_str());
        }
        if let Some(version) = &self.app_version {
            payload.insert(KEY_APP_VERSION, version.as_str());
        }
        if let Some(supporting) = self.supporting_id {
            payload.insert(KEY_SUPPORTING_ID, supporting.0 as i32);
        }
        payload
    }

    pub fn role(&self) -> Role {
        if self.supporting_id.is_some() {
            Role::Spectator
        } else {
            Role::Player
        }
    }
}

// ---------------------------------------------------------------------------
// Private text
// ---------------------------------------------------------------------------

/// Which chat channel a private text was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// `/m <text>`: plain chat line.
    Text,
    /// `/giphy <query>`
    Giphy,
    /// `/tenor <query>`
    Tenor,
}

/// A private text message, classified by its prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivateText {
    /// Public chat routed through the host (subject to filtering).
    Chat { kind: ChatKind, body: String },
    /// A private string message for the host only.
    Direct(String),
}

/// Splits a private text into chat-channel traffic and direct messages.
pub fn classify_private_text(text: &str) -> PrivateText {
    const PREFIXES: [(&str, ChatKind); 3] = [
        ("/m ", ChatKind::Text),
        ("/giphy ", ChatKind::Giphy),
        ("/tenor ", ChatKind::Tenor),
    ];
    for (prefix, kind) in PREFIXES {
        if let Some(body) = text.strip_prefix(prefix) {
            return PrivateText::Chat {
                kind,
                body: body.to_string(),
            };
        }
    }
    PrivateText::Direct(text.to_string())
}
