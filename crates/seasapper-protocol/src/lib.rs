//! Wire protocol for Seasapper.
//!
//! This crate defines the "language" clients and the server speak:
//!
//! - **Types** ([`Position`], [`FleetPlacement`], [`BoardView`], ...):
//!   coordinates, submissions and the views the server projects.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`], [`ErrorCode`]):
//!   the intents that come in and the events that go out.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room (rules)
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{ClientMessage, ErrorCode, ServerMessage};
pub use seasapper_transport::ConnectionId;
pub use types::{
    ArmorAssignment, BoardView, CellInfo, CellView, FleetPlacement,
    GameOverReason, GameStateView, GameStats, OpponentActionKind,
    Orientation, PendingScoutView, Phase, PlayerId, PlayerView, Position,
    Recipient, RoomClosedReason, RoomCode, ShipId, ShipPlacement, ShipView,
    ShotSummary,
};
