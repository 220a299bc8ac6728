//! Inbound client intents, outbound server events, and error codes.
//!
//! Both enums are internally tagged: `{"type": "Shoot", "x": 3, "y": 7}`.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::types::{
    BoardView, CellInfo, FleetPlacement, GameOverReason, GameStateView,
    GameStats, OpponentActionKind, Orientation, PlayerId, Position,
    RoomClosedReason, RoomCode, ShipId, ShipView, ShotSummary,
};

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Everything a client can ask for.
///
/// Disconnects are not a message: the transport reports them when the
/// socket closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Join (or rejoin) the room with this code. `player_id` is the id the
    /// server issued earlier, if the client has one.
    Join {
        room_code: RoomCode,
        display_name: String,
        #[serde(default)]
        player_id: Option<PlayerId>,
    },

    LeaveRoom,

    SubmitPlacement { fleet: FleetPlacement },

    Ready,

    Shoot { x: i32, y: i32 },

    Scan { x: i32, y: i32 },

    Scout { x: i32, y: i32 },

    Flag { x: i32, y: i32 },

    MoveShip {
        ship_id: ShipId,
        new_origin: Position,
        new_orientation: Orientation,
    },
}

impl ClientMessage {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::LeaveRoom => "leave_room",
            Self::SubmitPlacement { .. } => "submit_placement",
            Self::Ready => "ready",
            Self::Shoot { .. } => "shoot",
            Self::Scan { .. } => "scan",
            Self::Scout { .. } => "scout",
            Self::Flag { .. } => "flag",
            Self::MoveShip { .. } => "move_ship",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Everything the server can tell a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    RoomJoined {
        room_code: RoomCode,
        player_id: PlayerId,
        /// 1 or 2.
        seat_number: u8,
        waiting_for_opponent: bool,
    },

    OpponentJoined { opponent_name: String },

    OpponentDisconnected { opponent_name: String },

    OpponentReconnected { opponent_name: String },

    RoomClosed {
        reason: RoomClosedReason,
        message: String,
    },

    GameStart {
        opponent_name: String,
        your_turn: bool,
        your_player_id: PlayerId,
    },

    /// Outcome of the receiver's own shot.
    TurnResult {
        x: i32,
        y: i32,
        hit: bool,
        armor_hit: bool,
        sunk: bool,
        sunk_ship: Option<ShipView>,
        mine_hit: bool,
        adjacent_count: u8,
        game_over: bool,
        winner: Option<PlayerId>,
    },

    ScanResult { x: i32, y: i32, has_ships: bool },

    ScoutSent { x: i32, y: i32, reveal_turn: u32 },

    ScoutResult {
        x: i32,
        y: i32,
        cell_info: CellInfo,
    },

    FlagResult {
        x: i32,
        y: i32,
        success: bool,
        was_ship: bool,
        life_gained: bool,
        lives: u8,
    },

    OpponentAction {
        kind: OpponentActionKind,
        position: Position,
        result: Option<ShotSummary>,
    },

    TurnChanged {
        /// Seat index (0 or 1) of the player to move.
        current_turn: u8,
        turn_number: u32,
        your_turn: bool,
    },

    TimerUpdate {
        turn_time_left: u32,
        game_time_elapsed: u64,
    },

    GameOver {
        winner: PlayerId,
        winner_name: String,
        reason: GameOverReason,
        stats: GameStats,
    },

    SyncState {
        game_state: GameStateView,
        your_board: BoardView,
        opponent_board: BoardView,
    },

    Error { code: ErrorCode, message: String },
}

impl ServerMessage {
    /// Convenience constructor for `Error`.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Machine-readable rejection reasons. Every rejected request produces
/// exactly one of these, sent only to the connection that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    WrongPhase,
    NotYourTurn,
    InvalidPosition,
    AlreadyShot,
    InvalidFlag,
    InvalidPlacement,
    NoPlacement,
    Cooldown,
    NoScouts,
    MoveFailed,
    RoomFull,
    AlreadyInRoom,
    NotInRoom,
    RoomNotFound,
    InvalidData,
    ServerError,
    ServerShutdown,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WrongPhase => "WRONG_PHASE",
            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::InvalidPosition => "INVALID_POSITION",
            Self::AlreadyShot => "ALREADY_SHOT",
            Self::InvalidFlag => "INVALID_FLAG",
            Self::InvalidPlacement => "INVALID_PLACEMENT",
            Self::NoPlacement => "NO_PLACEMENT",
            Self::Cooldown => "COOLDOWN",
            Self::NoScouts => "NO_SCOUTS",
            Self::MoveFailed => "MOVE_FAILED",
            Self::RoomFull => "ROOM_FULL",
            Self::AlreadyInRoom => "ALREADY_IN_ROOM",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::InvalidData => "INVALID_DATA",
            Self::ServerError => "SERVER_ERROR",
            Self::ServerShutdown => "SERVER_SHUTDOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
