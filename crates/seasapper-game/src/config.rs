//! Rule constants for one game.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Largest accepted board edge. Keeps every coordinate well inside `i32`.
pub const MAX_BOARD_SIZE: usize = 64;

/// How many ships of one size a fleet must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipClass {
    pub size: u8,
    pub count: u8,
}

/// Every tunable rule of the game.
///
/// The defaults are the standard ruleset: a 10x10 board, a 4-3-3-2-2-2-1-1-1-1
/// fleet, 9 mines, 5 armor plates, 3 lives, 10 scouts and a 5-turn cooldown
/// on both scan and scout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width and height of each board.
    pub board_size: usize,

    /// Required fleet composition. Sizes must be distinct.
    pub fleet: Vec<ShipClass>,

    /// Exact number of mines each player places.
    pub mine_count: usize,

    /// Maximum armor plates per fleet.
    pub max_armor: usize,

    /// Starting and maximum lives.
    pub max_lives: u8,

    /// Scouts available per game.
    pub max_scouts: u8,

    /// Turns that must pass between two scans.
    pub scan_cooldown: u32,

    /// Turns that must pass between two scouts.
    pub scout_cooldown: u32,

    /// A scout sent on turn `t` is revealed on turn `t + scout_delay`.
    pub scout_delay: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: 10,
            fleet: vec![
                ShipClass { size: 4, count: 1 },
                ShipClass { size: 3, count: 2 },
                ShipClass { size: 2, count: 3 },
                ShipClass { size: 1, count: 4 },
            ],
            mine_count: 9,
            max_armor: 5,
            max_lives: 3,
            max_scouts: 10,
            scan_cooldown: 5,
            scout_cooldown: 5,
            scout_delay: 2,
        }
    }
}

impl GameConfig {
    /// Number of cells a complete fleet covers.
    pub fn total_ship_cells(&self) -> usize {
        self.fleet
            .iter()
            .map(|class| class.size as usize * class.count as usize)
            .sum()
    }

    /// Number of ships in a complete fleet.
    pub fn total_ships(&self) -> usize {
        self.fleet.iter().map(|class| class.count as usize).sum()
    }

    /// Checks that a legal fleet can exist under these rules.
    ///
    /// Ship sizes must be nonzero, distinct and no longer than the board
    /// edge. Ships and mines together must fit on the board.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_size == 0 || self.board_size > MAX_BOARD_SIZE {
            return Err(ConfigError::BoardSize {
                max: MAX_BOARD_SIZE,
                actual: self.board_size,
            });
        }
        if self.total_ships() == 0 {
            return Err(ConfigError::EmptyFleet);
        }
        let mut sizes = HashSet::new();
        for class in &self.fleet {
            if class.size == 0 || class.size as usize > self.board_size {
                return Err(ConfigError::ShipSize {
                    size: class.size,
                    board_size: self.board_size,
                });
            }
            if !sizes.insert(class.size) {
                return Err(ConfigError::DuplicateShipSize(class.size));
            }
        }
        let needed = self.total_ship_cells() + self.mine_count;
        let available = self.board_size * self.board_size;
        if needed > available {
            return Err(ConfigError::Overcrowded { needed, available });
        }
        if self.max_lives == 0 {
            return Err(ConfigError::NoLives);
        }
        Ok(())
    }

    /// How many ships of `size` the fleet requires (0 if none).
    pub fn required_count(&self, size: u8) -> usize {
        self.fleet
            .iter()
            .find(|class| class.size == size)
            .map_or(0, |class| class.count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_totals() {
        let config = GameConfig::default();
        assert_eq!(config.total_ship_cells(), 20);
        assert_eq!(config.total_ships(), 10);
        assert_eq!(config.required_count(2), 3);
        assert_eq!(config.required_count(5), 0);
    }

    #[test]
    fn test_config_partial_json_fills_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"mine_count": 4, "max_lives": 5}"#).unwrap();
        assert_eq!(config.mine_count, 4);
        assert_eq!(config.max_lives, 5);
        assert_eq!(config.board_size, 10);
        assert_eq!(config.scout_delay, 2);
    }

    #[test]
    fn test_validate_default_config_ok() {
        assert_eq!(GameConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_validate_zero_board_rejected() {
        let config = GameConfig {
            board_size: 0,
            ..GameConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::BoardSize { max: MAX_BOARD_SIZE, actual: 0 })
        );
    }

    #[test]
    fn test_validate_oversized_board_rejected() {
        let config = GameConfig {
            board_size: MAX_BOARD_SIZE + 1,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::BoardSize { .. })));
    }

    #[test]
    fn test_validate_empty_fleet_rejected() {
        let config = GameConfig {
            fleet: vec![ShipClass { size: 3, count: 0 }],
            ..GameConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyFleet));
    }

    #[test]
    fn test_validate_duplicate_ship_size_rejected() {
        let config = GameConfig {
            fleet: vec![ShipClass { size: 2, count: 1 }, ShipClass { size: 2, count: 2 }],
            ..GameConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::DuplicateShipSize(2)));
    }

    #[test]
    fn test_validate_ship_longer_than_board_rejected() {
        let config = GameConfig {
            board_size: 3,
            fleet: vec![ShipClass { size: 4, count: 1 }],
            mine_count: 0,
            ..GameConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ShipSize { size: 4, board_size: 3 })
        );
    }

    #[test]
    fn test_validate_too_many_mines_rejected() {
        let config = GameConfig {
            board_size: 4,
            fleet: vec![ShipClass { size: 1, count: 1 }],
            mine_count: 16,
            ..GameConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Overcrowded { needed: 17, available: 16 })
        );
    }

    #[test]
    fn test_validate_zero_lives_rejected() {
        let config = GameConfig {
            max_lives: 0,
            ..GameConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoLives));
    }

    #[test]
    fn test_validate_max_lives_at_type_limit_ok() {
        let config = GameConfig {
            max_lives: u8::MAX,
            ..GameConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }
}
