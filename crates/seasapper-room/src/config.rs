//! Room configuration.

use std::time::Duration;

use seasapper_clock::ClockConfig;
use seasapper_game::GameConfig;

/// Settings shared by every room a registry spawns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// Turn countdown.
    pub clock: ClockConfig,

    /// How long a disconnected player may take to come back before the
    /// room is closed.
    pub reconnect_grace: Duration,

    /// Capacity of each room actor's command channel.
    pub channel_size: usize,

    /// Game rules.
    pub rules: GameConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            reconnect_grace: Duration::from_secs(60),
            channel_size: 64,
            rules: GameConfig::default(),
        }
    }
}
