//! Shot and ability resolution for a running battle.
//!
//! A [`Battle`] owns both boards plus the turn counter. Every action checks
//! all of its preconditions before touching state, so a rejected action
//! leaves the battle exactly as it was.
//!
//! Which actions end the turn:
//!
//! | action               | ends turn |
//! |----------------------|-----------|
//! | miss                 | yes       |
//! | hit (sinking or not) | no        |
//! | armor hit            | yes       |
//! | mine hit             | yes       |
//! | scan, scout          | no        |
//! | flag (any outcome)   | yes       |
//! | move ship            | yes       |
//!
//! The battle never advances the turn on its own: the caller inspects the
//! report, checks for a winner, and calls [`Battle::advance_turn`].

use std::collections::HashSet;

use seasapper_protocol::{
    CellInfo, GameOverReason, GameStats, Orientation, PendingScoutView,
    Position, ShipId, ShipView, ShotSummary,
};

use crate::board::{neighbours, ship_cells};
use crate::{Ability, ActionError, Board, GameConfig, MoveError};

/// The other seat.
pub fn opponent(seat: usize) -> usize {
    1 - seat
}

// ---------------------------------------------------------------------------
// Per-player state
// ---------------------------------------------------------------------------

/// One player's side of a battle.
#[derive(Debug, Clone)]
pub struct Combatant {
    board: Board,
    lives: u8,
    scouts_remaining: u8,
    last_scan_turn: Option<u32>,
    last_scout_turn: Option<u32>,
    shots_fired: HashSet<Position>,
    flag_attempts: HashSet<Position>,
}

impl Combatant {
    fn new(board: Board, config: &GameConfig) -> Self {
        Self {
            board,
            lives: config.max_lives,
            scouts_remaining: config.max_scouts,
            last_scan_turn: None,
            last_scout_turn: None,
            shots_fired: HashSet::new(),
            flag_attempts: HashSet::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn lives(&self) -> u8 {
        self.lives
    }

    pub fn scouts_remaining(&self) -> u8 {
        self.scouts_remaining
    }

    pub fn last_scan_turn(&self) -> Option<u32> {
        self.last_scan_turn
    }

    pub fn last_scout_turn(&self) -> Option<u32> {
        self.last_scout_turn
    }

    pub fn has_fired_at(&self, pos: Position) -> bool {
        self.shots_fired.contains(&pos)
    }

    fn is_defeated(&self) -> Option<GameOverReason> {
        if self.lives == 0 {
            Some(GameOverReason::LivesDepleted)
        } else if self.board.all_ships_sunk() {
            Some(GameOverReason::ShipsDestroyed)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotKind {
    Miss,
    Hit,
    ArmorHit,
    MineHit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Victory {
    pub winner: usize,
    pub reason: GameOverReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotReport {
    pub position: Position,
    pub kind: ShotKind,
    pub adjacent_count: u8,
    /// Set only on the shot that sinks the ship.
    pub sunk_ship: Option<ShipView>,
    pub victory: Option<Victory>,
}

impl ShotReport {
    /// Armor hits count as hits.
    pub fn is_hit(&self) -> bool {
        matches!(self.kind, ShotKind::Hit | ShotKind::ArmorHit)
    }

    /// Only a normal hit keeps the turn.
    pub fn ends_turn(&self) -> bool {
        self.kind != ShotKind::Hit
    }

    /// What the victim is told.
    pub fn summary(&self) -> ShotSummary {
        ShotSummary {
            hit: self.is_hit(),
            armor_hit: self.kind == ShotKind::ArmorHit,
            mine_hit: self.kind == ShotKind::MineHit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub position: Position,
    pub has_ships: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoutReport {
    pub position: Position,
    pub reveal_turn: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagReport {
    pub position: Position,
    pub success: bool,
    pub was_ship: bool,
    pub life_gained: bool,
    pub lives: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    pub ship_id: ShipId,
    pub origin: Position,
    pub orientation: Orientation,
}

/// A scout whose answer was fixed when it was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingScout {
    pub owner: usize,
    pub position: Position,
    pub reveal_turn: u32,
    pub info: CellInfo,
}

/// Result of [`Battle::advance_turn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnAdvance {
    pub current_turn: usize,
    pub turn_number: u32,
    /// Scouts now due for the player whose turn it is.
    pub reveals: Vec<PendingScout>,
}

// ---------------------------------------------------------------------------
// Battle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Battle {
    config: GameConfig,
    fleets: [Combatant; 2],
    current_turn: usize,
    turn_number: u32,
    pending_scouts: Vec<PendingScout>,
    stats: GameStats,
    victory: Option<Victory>,
}

impl Battle {
    /// Starts a battle on turn 1 with `first_turn` (0 or 1) to move.
    pub fn new(config: GameConfig, boards: [Board; 2], first_turn: usize) -> Self {
        let [first, second] = boards;
        let fleets = [
            Combatant::new(first, &config),
            Combatant::new(second, &config),
        ];
        Self {
            config,
            fleets,
            current_turn: first_turn % 2,
            turn_number: 1,
            pending_scouts: Vec::new(),
            stats: GameStats::default(),
            victory: None,
        }
    }

    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn combatant(&self, seat: usize) -> &Combatant {
        &self.fleets[seat]
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    pub fn victory(&self) -> Option<Victory> {
        self.victory
    }

    /// Undelivered scouts owned by `seat`.
    pub fn pending_scouts_for(&self, seat: usize) -> Vec<PendingScoutView> {
        self.pending_scouts
            .iter()
            .filter(|scout| scout.owner == seat)
            .map(|scout| PendingScoutView {
                position: scout.position,
                reveal_turn: scout.reveal_turn,
            })
            .collect()
    }

    /// Turns until `seat` may use `ability` again; 0 means now.
    pub fn cooldown_remaining(&self, seat: usize, ability: Ability) -> u32 {
        let combatant = &self.fleets[seat];
        let (last, cooldown) = match ability {
            Ability::Scan => (combatant.last_scan_turn, self.config.scan_cooldown),
            Ability::Scout => (combatant.last_scout_turn, self.config.scout_cooldown),
        };
        match last {
            Some(last) => cooldown.saturating_sub(self.turn_number - last),
            None => 0,
        }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    pub fn shoot(
        &mut self,
        seat: usize,
        pos: Position,
    ) -> Result<ShotReport, ActionError> {
        self.ensure_can_act(seat)?;
        self.ensure_on_board(pos)?;
        if self.fleets[seat].shots_fired.contains(&pos) {
            return Err(ActionError::AlreadyShot(pos));
        }

        let (shooter, target) = pair_mut(&mut self.fleets, seat);
        let board = &mut target.board;
        let Some(cell) = board.cell_mut(pos) else {
            return Err(ActionError::InvalidPosition(pos));
        };
        cell.revealed = true;
        let has_mine = cell.has_mine;
        let occupant = cell.occupant;
        let adjacent = cell.adjacent_count;

        let mut sunk_ship = None;
        let kind = if has_mine {
            shooter.lives = shooter.lives.saturating_sub(1);
            shooter.shots_fired.insert(pos);
            self.stats.mines_triggered[seat] += 1;
            ShotKind::MineHit
        } else if let Some(occupant) = occupant {
            let ship = board.ship_mut(occupant.ship);
            if ship.is_armored_at(occupant.segment) {
                // The plate absorbs the shot; the cell stays shootable.
                ship.armor_broken = true;
                ShotKind::ArmorHit
            } else {
                let was_sunk = ship.is_sunk();
                ship.damaged.insert(occupant.segment);
                if !was_sunk && ship.is_sunk() {
                    sunk_ship = Some(ship.view());
                    self.stats.ships_destroyed[seat] += 1;
                }
                shooter.shots_fired.insert(pos);
                ShotKind::Hit
            }
        } else {
            shooter.shots_fired.insert(pos);
            ShotKind::Miss
        };

        let adjacent_count = if kind == ShotKind::MineHit { 0 } else { adjacent };

        tracing::debug!(
            seat,
            %pos,
            ?kind,
            sunk = sunk_ship.is_some(),
            "shot resolved"
        );

        Ok(ShotReport {
            position: pos,
            kind,
            adjacent_count,
            sunk_ship,
            victory: self.check_victory(),
        })
    }

    pub fn scan(
        &mut self,
        seat: usize,
        pos: Position,
    ) -> Result<ScanReport, ActionError> {
        self.ensure_can_act(seat)?;
        self.ensure_on_board(pos)?;
        self.ensure_off_cooldown(seat, Ability::Scan)?;

        let board = &self.fleets[opponent(seat)].board;
        let has_ships = std::iter::once(pos)
            .chain(neighbours(pos))
            .filter_map(|p| board.cell(p))
            .any(|cell| cell.occupant.is_some() && !cell.revealed);

        self.fleets[seat].last_scan_turn = Some(self.turn_number);
        Ok(ScanReport {
            position: pos,
            has_ships,
        })
    }

    pub fn scout(
        &mut self,
        seat: usize,
        pos: Position,
    ) -> Result<ScoutReport, ActionError> {
        self.ensure_can_act(seat)?;
        self.ensure_on_board(pos)?;
        if self.fleets[seat].scouts_remaining == 0 {
            return Err(ActionError::NoScouts);
        }
        self.ensure_off_cooldown(seat, Ability::Scout)?;

        let info = self.fleets[opponent(seat)]
            .board
            .cell_info(pos)
            .ok_or(ActionError::InvalidPosition(pos))?;

        let reveal_turn = self.turn_number + self.config.scout_delay;
        let scouter = &mut self.fleets[seat];
        scouter.scouts_remaining -= 1;
        scouter.last_scout_turn = Some(self.turn_number);
        self.pending_scouts.push(PendingScout {
            owner: seat,
            position: pos,
            reveal_turn,
            info,
        });

        Ok(ScoutReport {
            position: pos,
            reveal_turn,
        })
    }

    pub fn flag(
        &mut self,
        seat: usize,
        pos: Position,
    ) -> Result<FlagReport, ActionError> {
        self.ensure_can_act(seat)?;
        self.ensure_on_board(pos)?;
        let flagger = &self.fleets[seat];
        if flagger.shots_fired.contains(&pos) || flagger.flag_attempts.contains(&pos) {
            return Err(ActionError::AlreadyTargeted(pos));
        }
        let target = &self.fleets[opponent(seat)].board;
        let was_ship = match target.cell(pos) {
            Some(cell) if cell.revealed => return Err(ActionError::AlreadyRevealed(pos)),
            Some(cell) => cell.occupant.is_some(),
            None => return Err(ActionError::InvalidPosition(pos)),
        };

        let max_lives = self.config.max_lives;
        let (flagger, target) = pair_mut(&mut self.fleets, seat);
        let success = target.board.remove_mine(pos);
        let before = flagger.lives;
        if success {
            flagger.lives = flagger.lives.saturating_add(1).min(max_lives);
        }
        flagger.flag_attempts.insert(pos);

        Ok(FlagReport {
            position: pos,
            success,
            was_ship,
            life_gained: flagger.lives > before,
            lives: flagger.lives,
        })
    }

    pub fn move_ship(
        &mut self,
        seat: usize,
        ship_id: &ShipId,
        origin: Position,
        orientation: Orientation,
    ) -> Result<MoveReport, ActionError> {
        self.ensure_can_act(seat)?;
        let board = &self.fleets[seat].board;
        let key = board
            .find_ship(ship_id)
            .ok_or_else(|| MoveError::UnknownShip(ship_id.clone()))?;
        let ship = board.ship(key);
        if ship.is_damaged() {
            return Err(MoveError::Damaged(ship_id.clone()).into());
        }

        let cells = ship_cells(origin, orientation, ship.size);
        let mut targets = Vec::with_capacity(cells.len());
        for &pos in &cells {
            targets.push(board.cell(pos).ok_or(MoveError::OutOfBounds)?);
        }
        for (&pos, cell) in cells.iter().zip(&targets) {
            if cell.revealed {
                return Err(MoveError::OnRevealedCell(pos).into());
            }
            if let Some(other) = cell.occupant.filter(|o| o.ship != key) {
                return Err(MoveError::Overlap(board.ship(other.ship).id.clone()).into());
            }
            if cell.has_mine {
                return Err(MoveError::OnMine(pos).into());
            }
        }
        for &pos in &cells {
            let touching = neighbours(pos)
                .filter_map(|n| board.cell(n))
                .filter_map(|cell| cell.occupant)
                .find(|o| o.ship != key);
            if let Some(other) = touching {
                return Err(MoveError::Touching(board.ship(other.ship).id.clone()).into());
            }
        }

        // Validated above, so relocation cannot hit an off-board cell.
        if let Err(err) = self.fleets[seat].board.relocate_ship(key, origin, orientation) {
            tracing::error!(%err, "validated ship move failed to apply");
            return Err(MoveError::OutOfBounds.into());
        }

        Ok(MoveReport {
            ship_id: ship_id.clone(),
            origin,
            orientation,
        })
    }

    // -----------------------------------------------------------------------
    // Turn flow
    // -----------------------------------------------------------------------

    /// Hands the turn to the other seat and collects the scouts now due.
    pub fn advance_turn(&mut self) -> TurnAdvance {
        self.current_turn = opponent(self.current_turn);
        self.turn_number += 1;
        self.stats.total_turns += 1;

        let (current, turn) = (self.current_turn, self.turn_number);
        let (reveals, waiting): (Vec<_>, Vec<_>) = self
            .pending_scouts
            .drain(..)
            .partition(|scout| scout.owner == current && scout.reveal_turn <= turn);
        self.pending_scouts = waiting;

        TurnAdvance {
            current_turn: current,
            turn_number: turn,
            reveals,
        }
    }

    fn check_victory(&mut self) -> Option<Victory> {
        if self.victory.is_none() {
            self.victory = (0..2).find_map(|seat| {
                self.fleets[seat].is_defeated().map(|reason| Victory {
                    winner: opponent(seat),
                    reason,
                })
            });
        }
        self.victory
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    fn ensure_can_act(&self, seat: usize) -> Result<(), ActionError> {
        if self.victory.is_some() {
            return Err(ActionError::GameOver);
        }
        if seat != self.current_turn {
            return Err(ActionError::NotYourTurn);
        }
        Ok(())
    }

    fn ensure_on_board(&self, pos: Position) -> Result<(), ActionError> {
        if self.fleets[0].board.contains(pos) {
            Ok(())
        } else {
            Err(ActionError::InvalidPosition(pos))
        }
    }

    fn ensure_off_cooldown(&self, seat: usize, ability: Ability) -> Result<(), ActionError> {
        match self.cooldown_remaining(seat, ability) {
            0 => Ok(()),
            remaining => Err(ActionError::Cooldown { ability, remaining }),
        }
    }
}

/// `(acting, other)` borrowed mutably at once.
fn pair_mut(
    fleets: &mut [Combatant; 2],
    seat: usize,
) -> (&mut Combatant, &mut Combatant) {
    let [first, second] = fleets;
    if seat == 0 {
        (first, second)
    } else {
        (second, first)
    }
}
