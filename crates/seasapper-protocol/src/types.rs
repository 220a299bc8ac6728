//! Core protocol types: identifiers, grid coordinates, fleet submissions,
//! and the read-only views the server sends back.
//!
//! Everything here is plain data. The rules that produce these values live
//! in `seasapper-game`; this crate only fixes how they look on the wire.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Stable identifier for a player, issued on first join and kept across
/// reconnects.
///
/// `#[serde(transparent)]` puts the bare string on the wire, so a client
/// can store it and send it back unchanged in its next `Join`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The code players type in to meet in the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-chosen label for a ship, unique within one fleet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipId(pub String);

impl ShipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who inside a room should receive a server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every seated player.
    All,
    /// One specific player.
    Player(PlayerId),
    /// Everyone except the given player.
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// Grid geometry
// ---------------------------------------------------------------------------

/// A grid coordinate. Signed so that out-of-range input from a client
/// survives decoding and can be rejected with `INVALID_POSITION`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the position shifted by `(dx, dy)`, saturating at the
    /// `i32` limits. A saturated position is never on a board.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Direction a ship extends in from its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Unit step from one segment to the next.
    pub const fn step(self) -> (i32, i32) {
        match self {
            Self::Horizontal => (1, 0),
            Self::Vertical => (0, 1),
        }
    }
}

// ---------------------------------------------------------------------------
// Fleet submission
// ---------------------------------------------------------------------------

/// One ship as submitted by a client during placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPlacement {
    pub id: ShipId,
    pub size: u8,
    pub origin: Position,
    pub orientation: Orientation,
}

/// Puts the single armor plate of `ship_id` on `segment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorAssignment {
    pub ship_id: ShipId,
    pub segment: u8,
}

/// A complete placement: ships, mines, and armor plates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FleetPlacement {
    pub ships: Vec<ShipPlacement>,
    pub mines: Vec<Position>,
    #[serde(default)]
    pub armor: Vec<ArmorAssignment>,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// The true contents of one cell, as delivered by a scout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellInfo {
    pub has_ship: bool,
    pub has_mine: bool,
    pub adjacent_count: u8,
}

/// One cell as a particular viewer is allowed to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub x: i32,
    pub y: i32,
    pub revealed: bool,
    pub has_mine: bool,
    pub ship_id: Option<ShipId>,
    pub ship_segment: Option<u8>,
    pub adjacent_count: u8,
}

/// A ship snapshot. Sent for the owner's own fleet, for sunk enemy ships,
/// and inside a `TurnResult` that sinks a ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipView {
    pub id: ShipId,
    pub size: u8,
    pub origin: Position,
    pub orientation: Orientation,
    pub damaged_segments: Vec<u8>,
    pub armor_segment: Option<u8>,
    pub armor_broken: bool,
    pub sunk: bool,
}

/// A whole board projected for one viewer. `cells` is row-major:
/// `cells[y][x]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub size: usize,
    pub cells: Vec<Vec<CellView>>,
    pub ships: Vec<ShipView>,
    pub mines: Vec<Position>,
}

impl BoardView {
    /// A board with nothing placed and nothing revealed.
    pub fn empty(size: usize) -> Self {
        let cells = (0..size as i32)
            .map(|y| {
                (0..size as i32)
                    .map(|x| CellView {
                        x,
                        y,
                        revealed: false,
                        has_mine: false,
                        ship_id: None,
                        ship_segment: None,
                        adjacent_count: 0,
                    })
                    .collect()
            })
            .collect();
        Self {
            size,
            cells,
            ships: Vec::new(),
            mines: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Room state
// ---------------------------------------------------------------------------

/// The lifecycle phase of a room.
///
/// ```text
/// waiting → placement → battle → finished
///              ↑   ↓       ↑  ↓
///              waiting (a player is disconnected)
/// ```
///
/// Any phase may be forced to `finished` when the room is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Placement,
    Battle,
    Finished,
}

impl Phase {
    /// Returns `true` while a game is being set up or played.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Placement | Self::Battle)
    }

    /// Returns `true` if moving from `self` to `target` is a legal step.
    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (_, Self::Finished) => self != Self::Finished,
            (Self::Waiting, Self::Placement | Self::Battle) => true,
            (Self::Placement, Self::Battle | Self::Waiting) => true,
            (Self::Battle, Self::Waiting) => true,
            (Self::Finished, Self::Waiting) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Placement => write!(f, "placement"),
            Self::Battle => write!(f, "battle"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    ShipsDestroyed,
    LivesDepleted,
}

/// Why a room was force-closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomClosedReason {
    /// A player left on purpose.
    Left,
    /// A disconnected player did not come back in time.
    Timeout,
    /// The server is shutting down.
    Server,
}

/// Aggregate counters reported with `GameOver`. Arrays are indexed by seat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub total_turns: u32,
    pub ships_destroyed: [u32; 2],
    pub mines_triggered: [u32; 2],
}

/// Public per-player state inside a [`GameStateView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub seat: u8,
    pub connected: bool,
    pub ready: bool,
    pub lives: u8,
    pub scouts_remaining: u8,
    pub last_scan_turn: Option<u32>,
    pub last_scout_turn: Option<u32>,
    /// Turns until scan is available again; 0 means ready.
    pub scan_cooldown: u32,
    /// Turns until scout is available again; 0 means ready.
    pub scout_cooldown: u32,
    pub armors_placed: u8,
}

/// A scout reveal that has not been delivered yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingScoutView {
    pub position: Position,
    pub reveal_turn: u32,
}

/// The room/turn state sent inside a `SyncState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateView {
    pub room_code: RoomCode,
    pub phase: Phase,
    pub players: Vec<PlayerView>,
    pub current_turn: u8,
    pub turn_number: u32,
    pub turn_time_left: u32,
    pub game_time_elapsed: u64,
    pub winner: Option<PlayerId>,
    /// Only the receiving player's own scouts.
    pub pending_scouts: Vec<PendingScoutView>,
}

/// What the opponent did, for `OpponentAction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentActionKind {
    Shoot,
    Scan,
    Flag,
}

/// The part of a shot's outcome the victim is allowed to learn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotSummary {
    pub hit: bool,
    pub armor_hit: bool,
    pub mine_hit: bool,
}
