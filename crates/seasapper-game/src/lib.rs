//! Game rules for Seasapper: Battleship placement with Minesweeper hints.
//!
//! Everything in this crate is synchronous and owns no I/O. A room feeds
//! it validated coordinates and gets structured reports back.
//!
//! # Key types
//!
//! - [`GameConfig`]: every rule constant, injectable
//! - [`Board`]: one player's grid, ships and mines
//! - [`validate_fleet`]: placement rules
//! - [`Battle`]: two boards plus turn state; resolves shoot, scan,
//!   scout, flag and ship moves

mod battle;
mod board;
mod config;
mod error;
mod placement;

pub use battle::{
    Battle, Combatant, FlagReport, MoveReport, PendingScout, ScanReport,
    ScoutReport, ShotKind, ShotReport, TurnAdvance, Victory, opponent,
};
pub use board::{Board, Cell, Occupant, Ship, ShipKey, neighbours, ship_cells};
pub use config::{GameConfig, MAX_BOARD_SIZE, ShipClass};
pub use error::{
    Ability, ActionError, BoardError, ConfigError, MoveError, PlacementError,
};
pub use placement::validate_fleet;
