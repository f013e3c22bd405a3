//! What game logic hears from the SDK, and how it hears it.

use std::panic::{AssertUnwindSafe, catch_unwind};

use cinegame_chat::EmojiMatch;
use cinegame_protocol::{BackendId, ChatKind, Payload};
use cinegame_room::Participant;
use cinegame_session::{ConnectionState, FailureKind};
use tracing::error;

use crate::game::SessionInfo;

/// Error taxonomy for [`GameEvent::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// HTTP 401. Not retried.
    Authentication,
    /// HTTP 5xx or unreachable backend. Retried in the background.
    TransientBackend,
    /// Any other refused request. Not retried.
    ClientRequest,
    /// Every connect attempt to the realtime server failed.
    TransportConnect,
    /// The realtime connection dropped unexpectedly.
    TransportDisconnect,
    LoginFailed,
    RoomCreateFailed,
    /// No denylist could be loaded; chat is unfiltered.
    ChatFilterUnavailable,
}

impl From<FailureKind> for ErrorKind {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::ConnectFailed => Self::TransportConnect,
            FailureKind::ConnectionLost => Self::TransportDisconnect,
            FailureKind::LoginFailed => Self::LoginFailed,
            FailureKind::RoomCreateFailed => Self::RoomCreateFailed,
        }
    }
}

/// The merged event surface. Bots and network players produce the same
/// variants.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A game session exists and the room is being set up.
    SessionReady(SessionInfo),
    ConnectionStateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// Something failed that game logic may want to act on. `code` is the
    /// HTTP status or a transport sentinel.
    Error {
        kind: ErrorKind,
        code: i32,
        message: String,
    },
    /// A participant joined. The name has been filtered.
    ParticipantJoined(Participant),
    ParticipantLeft {
        id: BackendId,
    },
    ObjectMessage {
        from: BackendId,
        payload: Payload,
    },
    PrivateMessage {
        from: BackendId,
        text: String,
    },
    /// A filtered chat line with the emoji found in it.
    Chat {
        from: BackendId,
        kind: ChatKind,
        text: String,
        emojis: Vec<EmojiMatch>,
    },
    AvatarUpdated {
        id: BackendId,
        image: Vec<u8>,
        /// Mip levels the renderer should generate for `image`.
        mip_levels: u32,
    },
    /// The backend confirmed the results of a finished game.
    GameEndAcknowledged {
        code: String,
    },
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Receives [`GameEvent`]s. Closures taking `&GameEvent` implement this.
pub trait GameObserver: Send {
    fn on_event(&mut self, event: &GameEvent);
}

impl<F> GameObserver for F
where
    F: FnMut(&GameEvent) + Send,
{
    fn on_event(&mut self, event: &GameEvent) {
        self(event)
    }
}

/// Returned by [`EventBus::subscribe`]; pass to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Delivers each event to every observer in registration order.
///
/// An observer that panics is logged and skipped for that event; the
/// remaining observers still get it.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<(SubscriptionId, Box<dyn GameObserver>)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl GameObserver + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    pub fn dispatch(&mut self, event: &GameEvent) {
        for (id, observer) in &mut self.observers {
            let result = catch_unwind(AssertUnwindSafe(|| observer.on_event(event)));
            if result.is_err() {
                error!(subscription = id.0, ?event, "game observer panicked");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
