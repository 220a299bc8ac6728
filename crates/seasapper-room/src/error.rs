//! Error types for the room layer.

use seasapper_game::{ActionError, PlacementError};
use seasapper_protocol::{ErrorCode, Phase, RoomCode};

/// Why a room refused a request. The room is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("you are not seated in this room")]
    NotInRoom,

    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("you already joined a room")]
    AlreadyInRoom,

    #[error("not allowed while the room is in the {0} phase")]
    WrongPhase(Phase),

    #[error("invalid placement: {0}")]
    InvalidPlacement(#[from] PlacementError),

    #[error("submit a placement before getting ready")]
    NoPlacement,

    #[error(transparent)]
    Action(#[from] ActionError),

    /// The room actor stopped or its channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RoomError {
    /// The wire code sent with this rejection.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotInRoom => ErrorCode::NotInRoom,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::AlreadyInRoom => ErrorCode::AlreadyInRoom,
            Self::WrongPhase(_) => ErrorCode::WrongPhase,
            Self::InvalidPlacement(_) => ErrorCode::InvalidPlacement,
            Self::NoPlacement => ErrorCode::NoPlacement,
            Self::Action(err) => err.code(),
            Self::Unavailable(_) => ErrorCode::RoomNotFound,
            Self::Internal(_) => ErrorCode::ServerError,
        }
    }
}
