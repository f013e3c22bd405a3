//! Realtime transport session for the CineGame host SDK.
//!
//! Owns the host's single connection to the realtime game server: the
//! connect → login → room sequence with its retry bound and conflict
//! handling, the keep-alive and lag probes, outbound messages, and the
//! translation of raw server traffic into participant-level events.
//!
//! # How it fits in the stack
//!
//! ```text
//! Orchestrator (above)  ← applies SessionEvents, owns recovery policy
//!     ↕
//! Session (this crate)  ← connection state machine, inbound translation
//!     ↕
//! Transport (below)     ← moves frames, reports connection events
//! ```

mod config;
mod error;
mod event;
mod lag;
mod session;

pub use config::{ConnectionState, GameTarget, LagConfig, SessionConfig};
pub use error::SessionError;
pub use event::{
    CONNECT_FAILED, CONNECTION_LOST, Conflict, FailureKind, LOGIN_FAILED, ROOM_CREATE_FAILED,
    SessionEvent,
};
pub use lag::{LagMonitor, LagStats};
pub use session::TransportSession;
