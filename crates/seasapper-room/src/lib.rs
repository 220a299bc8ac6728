//! Rooms for Seasapper.
//!
//! A room seats two players, runs them through placement and battle, and
//! keeps the game alive across disconnects for a grace window.
//!
//! # Key types
//!
//! - [`Room`]: the synchronous state machine
//! - [`RoomHandle`]: talks to a room running as its own Tokio task
//! - [`RoomRegistry`]: creates, finds and sweeps rooms by code
//! - [`RoomConfig`]: timer, grace and rules settings

mod actor;
mod config;
mod error;
mod registry;
mod room;
mod seat;

pub use actor::{RoomHandle, RoomInfo, spawn_room};
pub use config::RoomConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{JoinAccepted, Room};
pub use seat::{Connection, Player, PlayerSender, Seat, generate_player_id};
