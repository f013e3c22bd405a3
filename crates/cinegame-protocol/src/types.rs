//! Core value types shared by every layer.
//!
//! Everything here travels on the wire at some point: participant ids,
//! connection handles assigned by the realtime server, and the typed
//! key/value [`Payload`] that carries gameplay data between the host and
//! its players.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Stable application-level identifier of a participant.
///
/// Real participants receive their id from the backend and it is always
/// non-negative. Bot participants are numbered by the bot harness with
/// negative ids. The sign is a wire convention shared with the backend;
/// inside the SDK it is only ever read through [`BackendId::kind`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BackendId(pub i64);

impl BackendId {
    /// Which kind of participant this id denotes.
    pub fn kind(self) -> ParticipantKind {
        if self.0 < 0 {
            ParticipantKind::Bot
        } else {
            ParticipantKind::Real
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bk:{}", self.0)
    }
}

/// Whether a participant arrives over the network or is simulated in-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantKind {
    /// A player or spectator connected through the realtime server.
    Real,
    /// A synthetic participant driven by the bot harness.
    Bot,
}

/// Handle the realtime server assigns to one user connection.
///
/// Only meaningful for the lifetime of that connection. The transport owns
/// it; everything else just looks it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionHandle(u64);

impl ConnectionHandle {
    /// Creates a handle from the server's raw user id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the server's raw user id.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user-{}", self.0)
    }
}

/// What a participant does in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Plays the game.
    Player,
    /// Supports one player (see `JoinInfo::supporting_id`).
    Spectator,
}

// ---------------------------------------------------------------------------
// Payload values
// ---------------------------------------------------------------------------

/// An RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Opaque color from RGB components.
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

/// One typed field of a [`Payload`].
///
/// Adjacently tagged so the other end can tell an `Int` from a `Float`
/// without guessing from the JSON number:
/// `{ "type": "Int", "value": 3 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Int(i32),
    Float(f32),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    Color(Color),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    BoolArray(Vec<bool>),
    StrArray(Vec<String>),
    BytesArray(Vec<Vec<u8>>),
    ColorArray(Vec<Color>),
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Self::Color(v)
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// A structured key/value message: the primary gameplay channel.
///
/// Keys are kept sorted so two payloads with the same content encode to the
/// same bytes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, Value>);

impl Payload {
    /// An empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Payload::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.0.get(key)? {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.0.get(key)? {
            Value::Float(v) => Some(*v),
            // Clients built with older engines send whole numbers as ints.
            Value::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        match self.0.get(key)? {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_color(&self, key: &str) -> Option<Color> {
        match self.0.get(key)? {
            Value::Color(v) => Some(*v),
            _ => None,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_id_kind_negative_is_bot() {
        assert_eq!(BackendId(-1).kind(), ParticipantKind::Bot);
        assert_eq!(BackendId(i64::MIN).kind(), ParticipantKind::Bot);
    }

    #[test]
    fn test_backend_id_kind_non_negative_is_real() {
        assert_eq!(BackendId(0).kind(), ParticipantKind::Real);
        assert_eq!(BackendId(4711).kind(), ParticipantKind::Real);
    }

    #[test]
    fn test_backend_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&BackendId(-3)).unwrap();
        assert_eq!(json, "-3");
    }

    #[test]
    fn test_connection_handle_display() {
        assert_eq!(ConnectionHandle::new(7).to_string(), "user-7");
        assert_eq!(ConnectionHandle::new(7).into_inner(), 7);
    }

    #[test]
    fn test_value_json_is_adjacently_tagged() {
        let json = serde_json::to_value(Value::Int(3)).unwrap();
        assert_eq!(json["type"], "Int");
        assert_eq!(json["value"], 3);
    }

    #[test]
    fn test_payload_typed_getters_reject_wrong_type() {
        let p = Payload::new().with("name", "Ada").with("age", 31);

        assert_eq!(p.get_str("name"), Some("Ada"));
        assert_eq!(p.get_int("age"), Some(31));
        assert_eq!(p.get_int("name"), None);
        assert_eq!(p.get_bool("missing"), None);
    }

    #[test]
    fn test_payload_get_float_accepts_int() {
        let p = Payload::new().with("x", 2);
        assert_eq!(p.get_float("x"), Some(2.0));
    }

    #[test]
    fn test_payload_serializes_as_sorted_object() {
        let p = Payload::new().with("b", true).with("a", Color::rgb(1.0, 0.0, 0.0));
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.find("\"a\"").unwrap() < json.find("\"b\"").unwrap());

        let back: Payload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_payload_array_variants_survive_json() {
        let p = Payload::new()
            .with("ints", Value::IntArray(vec![1, 2]))
            .with("blobs", Value::BytesArray(vec![vec![0xff], vec![]]));
        let back: Payload =
            serde_json::from_slice(&serde_json::to_vec(&p).unwrap()).unwrap();
        assert_eq!(back.get("ints"), Some(&Value::IntArray(vec![1, 2])));
        assert_eq!(back.len(), 2);
    }
}
