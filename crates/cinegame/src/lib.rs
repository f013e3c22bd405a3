//! # CineGame
//!
//! Host-side SDK for CineGame realtime games.
//!
//! The host asks the backend for a session code, opens a room on the
//! realtime server and relays between game logic and the participants who
//! join from their phones. Bots can stand in for players during
//! development, and chat lines and participant names pass through a
//! profanity filter before game logic sees them.
//!
//! Everything happens on the host's update loop: call
//! [`GameSdk::tick_at`] once per frame, or hand the SDK to
//! [`run_host_loop`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cinegame::prelude::*;
//!
//! # async fn host() -> Result<(), CineGameError> {
//! cinegame::logging::init();
//! let config = SdkConfig::from_env()?;
//! let backend = HttpBackend::new(&config)?;
//! let mut sdk = GameSdk::new(config, backend, WebSocketTransport::new());
//! sdk.subscribe(|event: &GameEvent| println!("{event:?}"));
//! sdk.start();
//! run_host_loop(&mut sdk, FrameLoop::with_rate(60), async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await;
//! # Ok(())
//! # }
//! ```

mod avatar;
mod backend;
mod config;
mod error;
mod events;
mod game;
pub mod logging;
mod release;
mod run;
mod sdk;

pub use avatar::{AvatarRejection, mip_levels, resolve_avatar_url};
pub use backend::{AvatarFetcher, BackendApi, BackendError, HttpBackend};
pub use config::{DEFAULT_TRUSTED_AVATAR_HOSTS, SdkConfig};
pub use error::{CineGameError, ConfigError};
pub use events::{ErrorKind, EventBus, GameEvent, GameObserver, SubscriptionId};
pub use game::{Features, GameResults, Rewards, SessionInfo};
pub use run::run_host_loop;
pub use sdk::GameSdk;

pub use cinegame_bots as bots;
pub use cinegame_chat as chat;
pub use cinegame_protocol as protocol;
pub use cinegame_room as room;
pub use cinegame_session as session;
pub use cinegame_tick as tick;
pub use cinegame_transport as transport;

pub use cinegame_session::ConnectionState;

/// Everything a host binary usually needs.
pub mod prelude {
    pub use crate::{
        BackendApi, CineGameError, ConnectionState, ErrorKind, GameEvent, GameResults, GameSdk,
        HttpBackend, SdkConfig, SessionInfo, run_host_loop,
    };
    pub use cinegame_protocol::{BackendId, Payload, Value};
    pub use cinegame_room::Participant;
    pub use cinegame_tick::FrameLoop;
    pub use cinegame_transport::WebSocketTransport;
}
