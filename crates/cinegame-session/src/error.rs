//! Error types for the session layer.

use cinegame_protocol::BackendId;
use cinegame_transport::TransportError;

use crate::ConnectionState;

/// Why a send-side session operation didn't happen.
///
/// Connection and room failures are not errors of this type: they arrive as
/// [`SessionEvent::Fatal`](crate::SessionEvent::Fatal) from `poll`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Messages, kicks and capacity changes need a joined room.
    #[error("not in a room (state: {0})")]
    NotInRoom(ConnectionState),

    /// No connection is mapped to this participant.
    #[error("no connection for participant {0}")]
    UnknownParticipant(BackendId),

    /// Bots are reached through the bot harness, not the session.
    #[error("participant {0} is a bot")]
    BotParticipant(BackendId),

    /// The transport refused the frame.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
