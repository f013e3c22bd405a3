//! Unified error type for the CineGame host SDK.

use cinegame_chat::ChatError;
use cinegame_protocol::ProtocolError;
use cinegame_room::DirectoryError;
use cinegame_session::SessionError;
use cinegame_transport::TransportError;

use crate::BackendError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CineGameError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A configuration value that could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use cinegame_protocol::BackendId;

    use super::*;
    use crate::ConnectionState;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let cg_err: CineGameError = err.into();
        assert!(matches!(cg_err, CineGameError::Transport(_)));
        assert!(cg_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotInRoom(ConnectionState::Connecting);
        let cg_err: CineGameError = err.into();
        assert!(matches!(cg_err, CineGameError::Session(_)));
        assert!(cg_err.to_string().contains("Connecting"));
    }

    #[test]
    fn test_from_directory_error() {
        let err = DirectoryError::NotFound(BackendId(3));
        let cg_err: CineGameError = err.into();
        assert!(matches!(cg_err, CineGameError::Directory(_)));
    }

    #[test]
    fn test_from_backend_error() {
        let cg_err: CineGameError = BackendError::from_status(503).into();
        assert!(matches!(cg_err, CineGameError::Backend(_)));
        assert!(cg_err.to_string().contains("503"));
    }
}
