//! One player's board: cells, ships, mines and the adjacency counts
//! derived from them.
//!
//! Ships live in an arena (`Vec<Ship>`) and cells only hold a [`ShipKey`]
//! into it. Ships are never removed, so a key stays valid for the life of
//! the board even when the ship moves.

use std::collections::BTreeSet;

use seasapper_protocol::{
    ArmorAssignment, BoardView, CellInfo, CellView, FleetPlacement,
    Orientation, Position, ShipId, ShipPlacement, ShipView,
};

use crate::BoardError;

// ---------------------------------------------------------------------------
// Geometry helpers
// ---------------------------------------------------------------------------

/// Offsets of the 8 Moore neighbours.
const NEIGHBOUR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Expands a ship into its cells. Index `i` of the result is segment `i`;
/// index 0 is the origin.
pub fn ship_cells(
    origin: Position,
    orientation: Orientation,
    size: u8,
) -> Vec<Position> {
    let (dx, dy) = orientation.step();
    (0..size as i32)
        .map(|i| origin.offset(dx * i, dy * i))
        .collect()
}

/// The 8 surrounding positions, unclipped.
pub fn neighbours(pos: Position) -> impl Iterator<Item = Position> {
    NEIGHBOUR_OFFSETS
        .iter()
        .map(move |&(dx, dy)| pos.offset(dx, dy))
}

// ---------------------------------------------------------------------------
// Cells and ships
// ---------------------------------------------------------------------------

/// Index of a ship inside its board's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShipKey(usize);

impl ShipKey {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Which ship and which of its segments sit on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    pub ship: ShipKey,
    pub segment: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub revealed: bool,
    pub has_mine: bool,
    pub occupant: Option<Occupant>,
    /// Ship segments plus live mines among the 8 neighbours.
    pub adjacent_count: u8,
}

impl Cell {
    fn is_occupied(&self) -> bool {
        self.occupant.is_some() || self.has_mine
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ship {
    pub id: ShipId,
    pub size: u8,
    pub origin: Position,
    pub orientation: Orientation,
    pub damaged: BTreeSet<u8>,
    pub armor_segment: Option<u8>,
    pub armor_broken: bool,
}

impl Ship {
    fn from_placement(placement: &ShipPlacement) -> Self {
        Self {
            id: placement.id.clone(),
            size: placement.size,
            origin: placement.origin,
            orientation: placement.orientation,
            damaged: BTreeSet::new(),
            armor_segment: None,
            armor_broken: false,
        }
    }

    pub fn cells(&self) -> Vec<Position> {
        ship_cells(self.origin, self.orientation, self.size)
    }

    pub fn is_sunk(&self) -> bool {
        self.damaged.len() >= self.size as usize
    }

    pub fn is_damaged(&self) -> bool {
        !self.damaged.is_empty()
    }

    /// `true` if `segment` still carries an unbroken armor plate.
    pub fn is_armored_at(&self, segment: u8) -> bool {
        !self.armor_broken && self.armor_segment == Some(segment)
    }

    pub fn view(&self) -> ShipView {
        ShipView {
            id: self.id.clone(),
            size: self.size,
            origin: self.origin,
            orientation: self.orientation,
            damaged_segments: self.damaged.iter().copied().collect(),
            armor_segment: self.armor_segment,
            armor_broken: self.armor_broken,
            sunk: self.is_sunk(),
        }
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    /// Row-major, `size * size` entries.
    cells: Vec<Cell>,
    ships: Vec<Ship>,
    mines: Vec<Position>,
}

impl Board {
    /// Builds a board and computes every adjacency count.
    ///
    /// Trusts its input apart from coordinates: overlapping ships are not
    /// detected here. Run [`crate::validate_fleet`] first.
    pub fn build(
        size: usize,
        ships: &[ShipPlacement],
        mines: &[Position],
        armor: &[ArmorAssignment],
    ) -> Result<Self, BoardError> {
        let mut board = Self {
            size,
            cells: vec![Cell::default(); size * size],
            ships: ships.iter().map(Ship::from_placement).collect(),
            mines: Vec::with_capacity(mines.len()),
        };

        for assignment in armor {
            let ship = board
                .ships
                .iter_mut()
                .find(|ship| ship.id == assignment.ship_id)
                .ok_or_else(|| {
                    BoardError::UnknownArmorShip(assignment.ship_id.clone())
                })?;
            if assignment.segment >= ship.size {
                return Err(BoardError::ArmorSegmentOutOfRange {
                    ship_id: ship.id.clone(),
                    segment: assignment.segment,
                });
            }
            ship.armor_segment = Some(assignment.segment);
        }

        for key in 0..board.ships.len() {
            board.stamp(ShipKey(key))?;
        }

        for &mine in mines {
            let cell = board.cell_mut(mine).ok_or(BoardError::OffBoard(mine))?;
            cell.has_mine = true;
            board.mines.push(mine);
        }

        board.recompute_adjacency();
        Ok(board)
    }

    /// Builds a board from a whole fleet submission.
    pub fn from_fleet(
        size: usize,
        fleet: &FleetPlacement,
    ) -> Result<Self, BoardError> {
        Self::build(size, &fleet.ships, &fleet.mines, &fleet.armor)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.index(pos).is_some()
    }

    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    pub(crate) fn cell_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        self.index(pos).map(move |i| &mut self.cells[i])
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn ship(&self, key: ShipKey) -> &Ship {
        &self.ships[key.0]
    }

    pub(crate) fn ship_mut(&mut self, key: ShipKey) -> &mut Ship {
        &mut self.ships[key.0]
    }

    pub fn find_ship(&self, id: &ShipId) -> Option<ShipKey> {
        self.ships.iter().position(|ship| &ship.id == id).map(ShipKey)
    }

    /// The ship covering `pos`, if any.
    pub fn ship_at(&self, pos: Position) -> Option<&Ship> {
        self.cell(pos)?
            .occupant
            .map(|occupant| self.ship(occupant.ship))
    }

    /// Live mines.
    pub fn mines(&self) -> &[Position] {
        &self.mines
    }

    pub fn all_ships_sunk(&self) -> bool {
        self.ships.iter().all(Ship::is_sunk)
    }

    pub fn armors_placed(&self) -> usize {
        self.ships
            .iter()
            .filter(|ship| ship.armor_segment.is_some())
            .count()
    }

    /// The true contents of a cell, or `None` off the board.
    pub fn cell_info(&self, pos: Position) -> Option<CellInfo> {
        self.cell(pos).map(|cell| CellInfo {
            has_ship: cell.occupant.is_some(),
            has_mine: cell.has_mine,
            adjacent_count: cell.adjacent_count,
        })
    }

    /// Recounts ships and mines around every cell.
    pub fn recompute_adjacency(&mut self) {
        let occupied: Vec<bool> =
            self.cells.iter().map(Cell::is_occupied).collect();
        let size = self.size as i32;
        for y in 0..size {
            for x in 0..size {
                let count = neighbours(Position::new(x, y))
                    .filter_map(|n| self.index(n))
                    .filter(|&i| occupied[i])
                    .count();
                let i = (y * size + x) as usize;
                self.cells[i].adjacent_count = count as u8;
            }
        }
    }

    /// Every adjacency count in row-major order.
    pub fn adjacency_grid(&self) -> Vec<u8> {
        self.cells.iter().map(|cell| cell.adjacent_count).collect()
    }

    /// Disarms the mine at `pos`. Returns `false` if there was none.
    pub(crate) fn remove_mine(&mut self, pos: Position) -> bool {
        let Some(cell) = self.cell_mut(pos) else {
            return false;
        };
        if !cell.has_mine {
            return false;
        }
        cell.has_mine = false;
        self.mines.retain(|&mine| mine != pos);
        self.recompute_adjacency();
        true
    }

    /// Moves a ship without checking the destination.
    pub(crate) fn relocate_ship(
        &mut self,
        key: ShipKey,
        origin: Position,
        orientation: Orientation,
    ) -> Result<(), BoardError> {
        for pos in self.ship(key).cells() {
            if let Some(cell) = self.cell_mut(pos) {
                cell.occupant = None;
            }
        }
        let ship = self.ship_mut(key);
        ship.origin = origin;
        ship.orientation = orientation;
        self.stamp(key)?;
        self.recompute_adjacency();
        Ok(())
    }

    fn stamp(&mut self, key: ShipKey) -> Result<(), BoardError> {
        for (segment, pos) in self.ship(key).cells().into_iter().enumerate() {
            let cell = self.cell_mut(pos).ok_or(BoardError::OffBoard(pos))?;
            cell.occupant = Some(Occupant {
                ship: key,
                segment: segment as u8,
            });
        }
        Ok(())
    }

    fn index(&self, pos: Position) -> Option<usize> {
        let size = self.size as i32;
        if pos.x < 0 || pos.y < 0 || pos.x >= size || pos.y >= size {
            return None;
        }
        Some((pos.y * size + pos.x) as usize)
    }

    // -----------------------------------------------------------------------
    // Projections
    // -----------------------------------------------------------------------

    /// Everything, for the board's owner.
    pub fn owner_view(&self) -> BoardView {
        BoardView {
            size: self.size,
            cells: self.rows(|_| true),
            ships: self.ships.iter().map(Ship::view).collect(),
            mines: self.mines.clone(),
        }
    }

    /// What the opponent may see: revealed cells and sunk ships only.
    pub fn masked_view(&self) -> BoardView {
        BoardView {
            size: self.size,
            cells: self.rows(|cell| cell.revealed),
            ships: self
                .ships
                .iter()
                .filter(|ship| ship.is_sunk())
                .map(Ship::view)
                .collect(),
            mines: Vec::new(),
        }
    }

    fn rows(&self, visible: impl Fn(&Cell) -> bool) -> Vec<Vec<CellView>> {
        self.cells
            .chunks(self.size)
            .enumerate()
            .map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .map(|(x, cell)| {
                        let shown = visible(cell);
                        let occupant = cell.occupant.filter(|_| shown);
                        CellView {
                            x: x as i32,
                            y: y as i32,
                            revealed: cell.revealed,
                            has_mine: shown && cell.has_mine,
                            ship_id: occupant
                                .map(|o| self.ship(o.ship).id.clone()),
                            ship_segment: occupant.map(|o| o.segment),
                            adjacent_count: if shown {
                                cell.adjacent_count
                            } else {
                                0
                            },
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ship(id: &str, size: u8, x: i32, y: i32, orientation: Orientation) -> ShipPlacement {
        ShipPlacement {
            id: ShipId::new(id),
            size,
            origin: Position::new(x, y),
            orientation,
        }
    }

    fn small_board() -> Board {
        Board::build(
            5,
            &[
                ship("a", 2, 0, 0, Orientation::Horizontal),
                ship("b", 1, 4, 4, Orientation::Vertical),
            ],
            &[Position::new(3, 0)],
            &[ArmorAssignment {
                ship_id: ShipId::new("a"),
                segment: 1,
            }],
        )
        .unwrap()
    }

    #[test]
    fn test_ship_cells_vertical_is_index_aligned() {
        let cells = ship_cells(Position::new(2, 3), Orientation::Vertical, 3);
        assert_eq!(
            cells,
            vec![Position::new(2, 3), Position::new(2, 4), Position::new(2, 5)]
        );
    }

    #[test]
    fn test_build_stamps_segments_and_armor() {
        let board = small_board();
        let cell = board.cell(Position::new(1, 0)).unwrap();
        let occupant = cell.occupant.unwrap();
        assert_eq!(occupant.segment, 1);
        assert_eq!(board.ship(occupant.ship).id, ShipId::new("a"));
        assert!(board.ship(occupant.ship).is_armored_at(1));
        assert_eq!(board.armors_placed(), 1);
    }

    #[test]
    fn test_build_computes_adjacency_from_ships_and_mines() {
        let board = small_board();
        // (2,0) touches ship cell (1,0) and mine (3,0).
        assert_eq!(board.cell(Position::new(2, 0)).unwrap().adjacent_count, 2);
        // (0,1) touches (0,0) and (1,0).
        assert_eq!(board.cell(Position::new(0, 1)).unwrap().adjacent_count, 2);
        assert_eq!(board.cell(Position::new(2, 3)).unwrap().adjacent_count, 0);
    }

    #[test]
    fn test_build_off_board_mine_fails() {
        let result = Board::build(5, &[], &[Position::new(5, 0)], &[]);
        assert_eq!(result, Err(BoardError::OffBoard(Position::new(5, 0))));
    }

    #[test]
    fn test_build_unknown_armor_ship_fails() {
        let result = Board::build(
            5,
            &[],
            &[],
            &[ArmorAssignment {
                ship_id: ShipId::new("ghost"),
                segment: 0,
            }],
        );
        assert!(matches!(result, Err(BoardError::UnknownArmorShip(_))));
    }

    #[test]
    fn test_recompute_adjacency_is_idempotent() {
        let mut board = small_board();
        let before = board.adjacency_grid();
        board.recompute_adjacency();
        let once = board.adjacency_grid();
        board.recompute_adjacency();
        assert_eq!(before, once);
        assert_eq!(once, board.adjacency_grid());
    }

    #[test]
    fn test_remove_mine_updates_adjacency() {
        let mut board = small_board();
        assert!(board.remove_mine(Position::new(3, 0)));
        assert!(board.mines().is_empty());
        assert_eq!(board.cell(Position::new(2, 0)).unwrap().adjacent_count, 1);
        assert!(!board.remove_mine(Position::new(3, 0)));
    }

    #[test]
    fn test_relocate_ship_clears_old_cells() {
        let mut board = small_board();
        let key = board.find_ship(&ShipId::new("b")).unwrap();
        board
            .relocate_ship(key, Position::new(0, 3), Orientation::Horizontal)
            .unwrap();
        assert!(board.cell(Position::new(4, 4)).unwrap().occupant.is_none());
        assert_eq!(board.ship_at(Position::new(0, 3)).unwrap().id, ShipId::new("b"));
        assert_eq!(board.cell(Position::new(1, 4)).unwrap().adjacent_count, 1);
    }

    #[test]
    fn test_masked_view_hides_unrevealed_cells() {
        let mut board = small_board();
        board.cell_mut(Position::new(0, 0)).unwrap().revealed = true;
        let view = board.masked_view();
        let revealed = &view.cells[0][0];
        assert_eq!(revealed.ship_id, Some(ShipId::new("a")));
        let hidden = &view.cells[0][3];
        assert!(!hidden.has_mine);
        assert_eq!(hidden.adjacent_count, 0);
        assert!(view.ships.is_empty());
        assert!(view.mines.is_empty());
    }

    #[test]
    fn test_masked_view_lists_sunk_ships_only() {
        let mut board = small_board();
        let key = board.find_ship(&ShipId::new("b")).unwrap();
        board.ship_mut(key).damaged.insert(0);
        let view = board.masked_view();
        assert_eq!(view.ships.len(), 1);
        assert_eq!(view.ships[0].id, ShipId::new("b"));
        assert_eq!(view.ships[0].damaged_segments, vec![0]);
    }

    #[test]
    fn test_owner_view_exposes_everything() {
        let view = small_board().owner_view();
        assert_eq!(view.ships.len(), 2);
        assert_eq!(view.mines, vec![Position::new(3, 0)]);
        assert!(view.cells[0][3].has_mine);
    }
}
