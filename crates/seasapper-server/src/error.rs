//! Top-level error type for the Seasapper server.

use std::path::PathBuf;

use seasapper_game::ConfigError;
use seasapper_protocol::ProtocolError;
use seasapper_room::RoomError;
use seasapper_transport::TransportError;

/// Wraps every crate-level error so `?` works across layers.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("cannot read rules file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid rules file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unplayable rules in {}: {source}", path.display())]
    ConfigInvalid {
        path: PathBuf,
        source: ConfigError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use seasapper_protocol::RoomCode;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::SendFailed(std::io::Error::other("gone"));
        let server_err: ServerError = err.into();
        assert!(matches!(server_err, ServerError::Transport(_)));
        assert!(server_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let server_err: ServerError = err.into();
        assert!(matches!(server_err, ServerError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error_keeps_message() {
        let err = RoomError::RoomFull(RoomCode::new("ABCD"));
        let server_err: ServerError = err.into();
        assert!(matches!(server_err, ServerError::Room(_)));
        assert_eq!(server_err.to_string(), "room ABCD is full");
    }
}
