//! Error types for the room layer.

use cinegame_protocol::{BackendId, ParticipantKind};

/// Errors from [`ParticipantDirectory`](crate::ParticipantDirectory)
/// mutations.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The route doesn't match the kind the id denotes, e.g. a network
    /// handle offered for a bot id.
    #[error("{id} is a {kind:?} participant, route does not match")]
    RouteMismatch { id: BackendId, kind: ParticipantKind },

    /// The id is not in the directory.
    #[error("participant {0} not found")]
    NotFound(BackendId),
}
