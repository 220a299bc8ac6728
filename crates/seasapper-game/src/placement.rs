//! Fleet placement rules.
//!
//! Checks run in a fixed order and the first failure wins:
//! fleet composition, mine count, armor, bounds, overlap, touching, mines.

use std::collections::{HashMap, HashSet};

use seasapper_protocol::{FleetPlacement, Position, ShipId};

use crate::board::{neighbours, ship_cells};
use crate::{GameConfig, PlacementError};

/// Validates a fleet without building or storing anything.
pub fn validate_fleet(
    config: &GameConfig,
    fleet: &FleetPlacement,
) -> Result<(), PlacementError> {
    check_composition(config, fleet)?;

    if fleet.mines.len() != config.mine_count {
        return Err(PlacementError::MineCount {
            expected: config.mine_count,
            actual: fleet.mines.len(),
        });
    }

    check_armor(config, fleet)?;

    let footprints: Vec<(&ShipId, Vec<Position>)> = fleet
        .ships
        .iter()
        .map(|ship| (&ship.id, ship_cells(ship.origin, ship.orientation, ship.size)))
        .collect();

    let in_bounds = |pos: &Position| {
        let size = config.board_size as i32;
        pos.x >= 0 && pos.y >= 0 && pos.x < size && pos.y < size
    };

    for (id, cells) in &footprints {
        if !cells.iter().all(in_bounds) {
            return Err(PlacementError::ShipOutOfBounds((*id).clone()));
        }
    }

    let mut occupied: HashMap<Position, &ShipId> = HashMap::new();
    for (id, cells) in &footprints {
        for &pos in cells {
            if let Some(other) = occupied.insert(pos, *id) {
                return Err(PlacementError::ShipsOverlap {
                    first: other.clone(),
                    second: (*id).clone(),
                    at: pos,
                });
            }
        }
    }

    for (id, cells) in &footprints {
        for &pos in cells {
            let touching = neighbours(pos)
                .filter_map(|n| occupied.get(&n))
                .find(|other| **other != *id);
            if let Some(other) = touching {
                return Err(PlacementError::ShipsTouching {
                    first: (*id).clone(),
                    second: (*other).clone(),
                });
            }
        }
    }

    let mut mines = HashSet::with_capacity(fleet.mines.len());
    for &mine in &fleet.mines {
        if !in_bounds(&mine) {
            return Err(PlacementError::MineOutOfBounds(mine));
        }
        if occupied.contains_key(&mine) {
            return Err(PlacementError::MineOnShip(mine));
        }
        if !mines.insert(mine) {
            return Err(PlacementError::DuplicateMine(mine));
        }
    }

    Ok(())
}

fn check_composition(
    config: &GameConfig,
    fleet: &FleetPlacement,
) -> Result<(), PlacementError> {
    if let Some(ship) = fleet
        .ships
        .iter()
        .find(|ship| config.required_count(ship.size) == 0)
    {
        return Err(PlacementError::UnexpectedShipSize(ship.id.clone()));
    }

    for class in &config.fleet {
        let actual = fleet
            .ships
            .iter()
            .filter(|ship| ship.size == class.size)
            .count();
        if actual != class.count as usize {
            return Err(PlacementError::ShipCount {
                size: class.size,
                expected: class.count as usize,
                actual,
            });
        }
    }

    let mut ids = HashSet::with_capacity(fleet.ships.len());
    for ship in &fleet.ships {
        if !ids.insert(&ship.id) {
            return Err(PlacementError::DuplicateShipId(ship.id.clone()));
        }
    }
    Ok(())
}

fn check_armor(
    config: &GameConfig,
    fleet: &FleetPlacement,
) -> Result<(), PlacementError> {
    if fleet.armor.len() > config.max_armor {
        return Err(PlacementError::TooMuchArmor {
            count: fleet.armor.len(),
            max: config.max_armor,
        });
    }

    let mut plated = HashSet::with_capacity(fleet.armor.len());
    for assignment in &fleet.armor {
        let ship = fleet
            .ships
            .iter()
            .find(|ship| ship.id == assignment.ship_id)
            .ok_or_else(|| {
                PlacementError::UnknownArmorShip(assignment.ship_id.clone())
            })?;
        if assignment.segment >= ship.size {
            return Err(PlacementError::ArmorSegmentOutOfRange {
                ship_id: ship.id.clone(),
                segment: assignment.segment,
                size: ship.size,
            });
        }
        if !plated.insert(&ship.id) {
            return Err(PlacementError::DuplicateArmor(ship.id.clone()));
        }
    }
    Ok(())
}
