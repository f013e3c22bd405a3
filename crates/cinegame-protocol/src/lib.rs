//! Wire vocabulary for the CineGame host SDK.
//!
//! - **Types** ([`BackendId`], [`ConnectionHandle`], [`Payload`], [`Value`]):
//!   identities and the typed key/value payloads of gameplay messages.
//! - **Join** ([`JoinInfo`], [`classify_private_text`]): the identity
//!   announcement clients send on first contact and the chat-prefix
//!   convention for private text.
//! - **Frames** ([`Envelope`], [`ClientFrame`], [`ServerFrame`]): what the
//!   host and the realtime game server say to each other.
//! - **HTTP** ([`CreateGameRequest`], [`CreateGameResponse`],
//!   [`EndGameRequest`]): backend API bodies.
//! - **Codec** ([`Codec`], [`JsonCodec`]): bytes ↔ frames.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Session (participants, room)
//! ```

mod codec;
mod error;
mod frames;
mod http;
mod join;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use frames::{
    ALREADY_LOGGED_IN, ClientFrame, Envelope, Frame, ROOM_NAME_TAKEN, RoomInfo,
    RoomPermissions, RoomSettings, RoomVariable, ServerFrame, Target, UserInfo,
};
pub use http::{CreateGameRequest, CreateGameResponse, EndGameRequest};
pub use join::{ChatKind, JoinInfo, KEY_BACKEND_ID, PrivateText, classify_private_text};
pub use types::{
    BackendId, Color, ConnectionHandle, ParticipantKind, Payload, Role, Value,
};
