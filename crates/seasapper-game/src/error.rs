//! Error types for the game layer.

use std::fmt;

use seasapper_protocol::{ErrorCode, Position, ShipId};

/// A board could not be built from the given coordinates.
///
/// Only reachable when a caller skips [`crate::validate_fleet`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("coordinate {0} is off the board")]
    OffBoard(Position),

    #[error("armor references unknown ship {0}")]
    UnknownArmorShip(ShipId),

    #[error("armor segment {segment} is outside ship {ship_id}")]
    ArmorSegmentOutOfRange { ship_id: ShipId, segment: u8 },
}

/// A rule set that no fleet could satisfy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("board size must be between 1 and {max}, got {actual}")]
    BoardSize { max: usize, actual: usize },

    #[error("the fleet has no ships")]
    EmptyFleet,

    #[error("ship size {size} does not fit a {board_size}x{board_size} board")]
    ShipSize { size: u8, board_size: usize },

    #[error("ship size {0} appears in more than one fleet entry")]
    DuplicateShipSize(u8),

    #[error("ships and mines need {needed} cells, the board has {available}")]
    Overcrowded { needed: usize, available: usize },

    #[error("max_lives must be at least 1")]
    NoLives,
}

/// Why a submitted fleet was rejected. The `Display` text is the
/// sub-reason sent with `INVALID_PLACEMENT`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("expected {expected} ships of size {size}, got {actual}")]
    ShipCount {
        size: u8,
        expected: usize,
        actual: usize,
    },

    #[error("ship {0} has a size that is not part of the fleet")]
    UnexpectedShipSize(ShipId),

    #[error("ship id {0} is used more than once")]
    DuplicateShipId(ShipId),

    #[error("expected {expected} mines, got {actual}")]
    MineCount { expected: usize, actual: usize },

    #[error("at most {max} armor plates allowed, got {count}")]
    TooMuchArmor { count: usize, max: usize },

    #[error("armor references unknown ship {0}")]
    UnknownArmorShip(ShipId),

    #[error("ship {0} already carries armor")]
    DuplicateArmor(ShipId),

    #[error("armor segment {segment} is outside ship {ship_id} of size {size}")]
    ArmorSegmentOutOfRange {
        ship_id: ShipId,
        segment: u8,
        size: u8,
    },

    #[error("ship {0} extends past the board edge")]
    ShipOutOfBounds(ShipId),

    #[error("ships {first} and {second} overlap at {at}")]
    ShipsOverlap {
        first: ShipId,
        second: ShipId,
        at: Position,
    },

    #[error("ships {first} and {second} touch")]
    ShipsTouching { first: ShipId, second: ShipId },

    #[error("mine at {0} is off the board")]
    MineOutOfBounds(Position),

    #[error("mine at {0} sits on a ship")]
    MineOnShip(Position),

    #[error("two mines at {0}")]
    DuplicateMine(Position),
}

/// Why a ship could not be relocated. Sent as the sub-reason of
/// `MOVE_FAILED`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("no ship with id {0}")]
    UnknownShip(ShipId),

    #[error("ship {0} is damaged and cannot move")]
    Damaged(ShipId),

    #[error("new position is off the board")]
    OutOfBounds,

    #[error("new position overlaps ship {0}")]
    Overlap(ShipId),

    #[error("new position touches ship {0}")]
    Touching(ShipId),

    #[error("new position covers a mine at {0}")]
    OnMine(Position),

    #[error("new position covers revealed cell {0}")]
    OnRevealedCell(Position),
}

/// An ability gated by a cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ability {
    Scan,
    Scout,
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan => write!(f, "scan"),
            Self::Scout => write!(f, "scout"),
        }
    }
}

/// A battle action was rejected. Nothing was changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("it is not your turn")]
    NotYourTurn,

    #[error("the game is already over")]
    GameOver,

    #[error("{0} is outside the board")]
    InvalidPosition(Position),

    #[error("you already shot at {0}")]
    AlreadyShot(Position),

    #[error("you already targeted {0}")]
    AlreadyTargeted(Position),

    #[error("cell {0} is already revealed")]
    AlreadyRevealed(Position),

    #[error("{ability} is on cooldown for {remaining} more turn(s)")]
    Cooldown { ability: Ability, remaining: u32 },

    #[error("no scouts left")]
    NoScouts,

    #[error("move failed: {0}")]
    MoveFailed(#[from] MoveError),
}

impl ActionError {
    /// The wire code reported for this rejection.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotYourTurn => ErrorCode::NotYourTurn,
            Self::GameOver => ErrorCode::WrongPhase,
            Self::InvalidPosition(_) => ErrorCode::InvalidPosition,
            Self::AlreadyShot(_) => ErrorCode::AlreadyShot,
            Self::AlreadyTargeted(_) | Self::AlreadyRevealed(_) => {
                ErrorCode::InvalidFlag
            }
            Self::Cooldown { .. } => ErrorCode::Cooldown,
            Self::NoScouts => ErrorCode::NoScouts,
            Self::MoveFailed(_) => ErrorCode::MoveFailed,
        }
    }
}
