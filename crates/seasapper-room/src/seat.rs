//! Seats and the players sitting in them.

use rand::Rng;
use seasapper_game::Board;
use seasapper_protocol::{ConnectionId, PlayerId, ServerMessage};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Channel for delivering outbound messages to one connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

/// The live connection currently attached to a player.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub sender: PlayerSender,
}

impl Connection {
    pub fn new(id: ConnectionId, sender: PlayerSender) -> Self {
        Self { id, sender }
    }

    /// Sends a message, dropping it silently if the socket task is gone.
    pub fn send(&self, msg: ServerMessage) {
        let _ = self.sender.send(msg);
    }
}

#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub connection: Connection,
    pub ready: bool,
    /// Set while the player has no live connection.
    pub disconnected_at: Option<Instant>,
    /// The accepted fleet, until the battle takes ownership of it.
    pub placement: Option<Board>,
}

impl Player {
    pub fn new(name: String, connection: Connection) -> Self {
        Self {
            id: generate_player_id(),
            name,
            connection,
            ready: false,
            disconnected_at: None,
            placement: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.disconnected_at.is_none()
    }
}

/// One of the two places at the table.
#[derive(Debug, Default)]
pub enum Seat {
    #[default]
    Empty,
    Occupied(Player),
}

impl Seat {
    pub fn player(&self) -> Option<&Player> {
        match self {
            Self::Occupied(player) => Some(player),
            Self::Empty => None,
        }
    }

    pub fn player_mut(&mut self) -> Option<&mut Player> {
        match self {
            Self::Occupied(player) => Some(player),
            Self::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A random 32-character hex id (128 bits).
pub fn generate_player_id() -> PlayerId {
    let bytes: [u8; 16] = rand::rng().random();
    PlayerId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
