//! The room state machine.
//!
//! [`Room`] is synchronous and single-owner: the room actor holds it and
//! feeds it one command at a time, so every operation sees a consistent
//! snapshot. All outbound traffic goes straight into the seated players'
//! channels.
//!
//! ```text
//! waiting ──(2nd seat filled)──▶ placement ──(both ready)──▶ battle ──(win)──▶ finished
//!    ▲                              │  ▲                      │  ▲
//!    └──────(disconnect)────────────┘  └────(all reconnected)─┘  │
//!                                                                 │
//! any phase ──(leave / grace expiry / shutdown)──▶ finished ──────┘ (vacant room reused)
//! ```

use rand::Rng;
use seasapper_clock::{ClockTick, TurnClock};
use seasapper_game::{
    Ability, Battle, Board, FlagReport, ScanReport, ScoutReport, ShotReport, TurnAdvance,
    Victory, opponent, validate_fleet,
};
use seasapper_protocol::{
    BoardView, ClientMessage, ConnectionId, FleetPlacement, GameStateView,
    OpponentActionKind, Orientation, Phase, PlayerId, PlayerView, Position,
    Recipient, RoomClosedReason, RoomCode, ServerMessage, ShipId,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::seat::{Connection, Player, Seat};
use crate::{RoomConfig, RoomError};

/// A successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinAccepted {
    pub player_id: PlayerId,
    /// Seat index, 0 or 1.
    pub seat: usize,
    /// `true` if an existing player was reattached rather than seated.
    pub reattached: bool,
}

pub struct Room {
    code: RoomCode,
    config: RoomConfig,
    seats: [Seat; 2],
    phase: Phase,
    /// Phase to restore once every seated player is connected again.
    resume_phase: Option<Phase>,
    battle: Option<Battle>,
    clock: TurnClock,
    started_at: Option<Instant>,
}

impl Room {
    pub fn new(code: RoomCode, config: RoomConfig) -> Self {
        let clock = TurnClock::new(config.clock.clone());
        Self {
            code,
            config,
            seats: [Seat::Empty, Seat::Empty],
            phase: Phase::Waiting,
            resume_phase: None,
            battle: None,
            clock,
            started_at: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn battle(&self) -> Option<&Battle> {
        self.battle.as_ref()
    }

    pub fn clock(&self) -> &TurnClock {
        &self.clock
    }

    pub fn seat(&self, index: usize) -> &Seat {
        &self.seats[index]
    }

    /// When the earliest still-disconnected player runs out of grace.
    ///
    /// Each player gets the full window from their own disconnect. A
    /// finished room has no deadline.
    pub fn grace_deadline(&self) -> Option<Instant> {
        if self.phase == Phase::Finished {
            return None;
        }
        self.players()
            .filter_map(|p| p.disconnected_at)
            .min()
            .map(|at| at + self.config.reconnect_grace)
    }

    pub fn occupied_seats(&self) -> usize {
        self.seats.iter().filter(|seat| !seat.is_empty()).count()
    }

    pub fn connected_players(&self) -> usize {
        self.players().filter(|p| p.is_connected()).count()
    }

    pub fn seat_of(&self, player_id: &PlayerId) -> Option<usize> {
        self.seats
            .iter()
            .position(|seat| seat.player().is_some_and(|p| &p.id == player_id))
    }

    fn players(&self) -> impl Iterator<Item = &Player> {
        self.seats.iter().filter_map(Seat::player)
    }

    /// Every seated player has a live connection.
    fn all_connected(&self) -> bool {
        self.players().all(Player::is_connected)
    }

    // -----------------------------------------------------------------------
    // Joining and leaving
    // -----------------------------------------------------------------------

    /// Seats a new player or reattaches a returning one.
    ///
    /// A returning player is matched by `player_id` first, then by display
    /// name among disconnected players.
    pub fn join(
        &mut self,
        name: String,
        player_id: Option<PlayerId>,
        connection: Connection,
    ) -> Result<JoinAccepted, RoomError> {
        if self.phase == Phase::Finished && self.occupied_seats() == 0 {
            self.reset();
        }

        let returning = player_id
            .as_ref()
            .and_then(|id| self.seat_of(id))
            .or_else(|| {
                self.seats.iter().position(|seat| {
                    seat.player()
                        .is_some_and(|p| !p.is_connected() && p.name == name)
                })
            });
        if let Some(seat) = returning {
            return self.reattach(seat, connection);
        }

        let seat = self
            .seats
            .iter()
            .position(Seat::is_empty)
            .ok_or_else(|| RoomError::RoomFull(self.code.clone()))?;

        let player = Player::new(name, connection);
        let player_id = player.id.clone();
        info!(
            room_code = %self.code,
            %player_id,
            seat,
            name = %player.name,
            "player joined"
        );
        self.seats[seat] = Seat::Occupied(player);

        let other = opponent(seat);
        self.send_seat(
            seat,
            ServerMessage::RoomJoined {
                room_code: self.code.clone(),
                player_id: player_id.clone(),
                seat_number: seat as u8 + 1,
                waiting_for_opponent: self.seats[other].is_empty(),
            },
        );

        if let (Some(first), Some(second)) =
            (self.seats[0].player(), self.seats[1].player())
        {
            first.connection.send(ServerMessage::OpponentJoined {
                opponent_name: second.name.clone(),
            });
            second.connection.send(ServerMessage::OpponentJoined {
                opponent_name: first.name.clone(),
            });
            if self.all_connected() {
                self.transition(Phase::Placement);
            } else {
                self.resume_phase = Some(Phase::Placement);
            }
        }

        Ok(JoinAccepted {
            player_id,
            seat,
            reattached: false,
        })
    }

    fn reattach(
        &mut self,
        seat: usize,
        connection: Connection,
    ) -> Result<JoinAccepted, RoomError> {
        let other = opponent(seat);
        let waiting_for_opponent = self.seats[other].is_empty();
        let Some(player) = self.seats[seat].player_mut() else {
            return Err(RoomError::Internal("reattach on an empty seat".into()));
        };
        let was_disconnected = player.disconnected_at.take().is_some();
        player.connection = connection;
        let player_id = player.id.clone();
        let name = player.name.clone();
        let has_board = player.placement.is_some();

        info!(
            room_code = %self.code,
            %player_id,
            seat,
            was_disconnected,
            "player reattached"
        );

        self.send_seat(
            seat,
            ServerMessage::RoomJoined {
                room_code: self.code.clone(),
                player_id: player_id.clone(),
                seat_number: seat as u8 + 1,
                waiting_for_opponent,
            },
        );
        if was_disconnected {
            self.send_seat(
                other,
                ServerMessage::OpponentReconnected {
                    opponent_name: name,
                },
            );
        }

        if self.all_connected() {
            if let Some(phase) = self.resume_phase.take() {
                self.transition(phase);
                if phase == Phase::Battle {
                    self.clock.resume();
                }
            }
        }

        if has_board || self.battle.is_some() {
            let sync = self.sync_state(seat);
            self.send_seat(seat, sync);
        }

        Ok(JoinAccepted {
            player_id,
            seat,
            reattached: true,
        })
    }

    /// Marks a player as gone and starts the grace window.
    ///
    /// Ignored if `connection_id` is not the player's current connection.
    pub fn disconnect(&mut self, player_id: &PlayerId, connection_id: ConnectionId) {
        let Some(seat) = self.seat_of(player_id) else {
            return;
        };
        let now = Instant::now();
        let Some(player) = self.seats[seat].player_mut() else {
            return;
        };
        if player.connection.id != connection_id {
            debug!(
                room_code = %self.code,
                %player_id,
                %connection_id,
                "ignoring disconnect from a replaced connection"
            );
            return;
        }
        if player.disconnected_at.is_some() {
            return;
        }
        player.disconnected_at = Some(now);
        let name = player.name.clone();
        info!(room_code = %self.code, %player_id, seat, "player disconnected");

        if self.phase == Phase::Finished {
            return;
        }

        if self.resume_phase.is_none() {
            self.resume_phase = Some(self.phase);
        }
        self.transition(Phase::Waiting);
        self.clock.pause();
        self.send_seat(
            opponent(seat),
            ServerMessage::OpponentDisconnected {
                opponent_name: name,
            },
        );
    }

    /// Closes the room if the grace window has run out.
    pub fn on_grace_expired(&mut self) {
        match self.grace_deadline() {
            Some(deadline) if deadline <= Instant::now() => {
                info!(room_code = %self.code, "reconnect grace expired");
                self.close(RoomClosedReason::Timeout);
            }
            _ => {}
        }
    }

    /// Vacates the player's seat and closes the room for whoever remains.
    pub fn leave(&mut self, player_id: &PlayerId) -> Result<(), RoomError> {
        let seat = self.seat_of(player_id).ok_or(RoomError::NotInRoom)?;
        info!(room_code = %self.code, %player_id, seat, "player left");
        self.seats[seat] = Seat::Empty;
        self.close(RoomClosedReason::Left);
        Ok(())
    }

    /// Notifies everyone still seated, empties both seats and finishes the
    /// room.
    pub fn close(&mut self, reason: RoomClosedReason) {
        let message = match reason {
            RoomClosedReason::Left => "Your opponent left the room",
            RoomClosedReason::Timeout => "A player did not reconnect in time",
            RoomClosedReason::Server => "The server is shutting down",
        };
        self.dispatch(
            Recipient::All,
            ServerMessage::RoomClosed {
                reason,
                message: message.to_owned(),
            },
        );
        self.seats = [Seat::Empty, Seat::Empty];
        self.transition(Phase::Finished);
        self.clock.stop();
        self.battle = None;
        self.resume_phase = None;
        info!(room_code = %self.code, ?reason, "room closed");
    }

    fn reset(&mut self) {
        debug!(room_code = %self.code, "reusing vacant room");
        self.transition(Phase::Waiting);
        self.battle = None;
        self.started_at = None;
        self.resume_phase = None;
        self.clock.stop();
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Applies one client intent from a seated player.
    pub fn handle_intent(
        &mut self,
        player_id: &PlayerId,
        msg: ClientMessage,
    ) -> Result<(), RoomError> {
        match msg {
            ClientMessage::Join { .. } => Err(RoomError::AlreadyInRoom),
            ClientMessage::LeaveRoom => self.leave(player_id),
            ClientMessage::SubmitPlacement { fleet } => {
                self.submit_placement(player_id, &fleet)
            }
            ClientMessage::Ready => self.ready(player_id),
            ClientMessage::Shoot { x, y } => self.shoot(player_id, Position::new(x, y)),
            ClientMessage::Scan { x, y } => self.scan(player_id, Position::new(x, y)),
            ClientMessage::Scout { x, y } => self.scout(player_id, Position::new(x, y)),
            ClientMessage::Flag { x, y } => self.flag(player_id, Position::new(x, y)),
            ClientMessage::MoveShip {
                ship_id,
                new_origin,
                new_orientation,
            } => self.move_ship(player_id, &ship_id, new_origin, new_orientation),
        }
    }

    /// Validates and stores a fleet. A later submission replaces it.
    pub fn submit_placement(
        &mut self,
        player_id: &PlayerId,
        fleet: &FleetPlacement,
    ) -> Result<(), RoomError> {
        let seat = self.seat_of(player_id).ok_or(RoomError::NotInRoom)?;
        if self.phase != Phase::Placement {
            return Err(RoomError::WrongPhase(self.phase));
        }
        validate_fleet(&self.config.rules, fleet)?;
        let board = Board::from_fleet(self.config.rules.board_size, fleet)
            .map_err(|err| RoomError::Internal(format!("validated fleet rejected: {err}")))?;

        if let Some(player) = self.seats[seat].player_mut() {
            player.placement = Some(board);
        }
        debug!(room_code = %self.code, %player_id, "placement accepted");
        Ok(())
    }

    pub fn ready(&mut self, player_id: &PlayerId) -> Result<(), RoomError> {
        let seat = self.seat_of(player_id).ok_or(RoomError::NotInRoom)?;
        if self.phase != Phase::Placement {
            return Err(RoomError::WrongPhase(self.phase));
        }
        let Some(player) = self.seats[seat].player_mut() else {
            return Err(RoomError::NotInRoom);
        };
        if player.placement.is_none() {
            return Err(RoomError::NoPlacement);
        }
        player.ready = true;
        debug!(room_code = %self.code, %player_id, "player ready");

        if self.players().filter(|p| p.ready).count() == 2 {
            self.start_battle()?;
        }
        Ok(())
    }

    fn start_battle(&mut self) -> Result<(), RoomError> {
        let [first, second] = &mut self.seats;
        let (Some(a), Some(b)) = (first.player_mut(), second.player_mut()) else {
            return Err(RoomError::Internal("battle started with an empty seat".into()));
        };
        let (Some(board_a), Some(board_b)) = (a.placement.take(), b.placement.take()) else {
            return Err(RoomError::Internal("battle started without boards".into()));
        };

        let first_turn = rand::rng().random_range(0..2);
        self.battle = Some(Battle::new(
            self.config.rules.clone(),
            [board_a, board_b],
            first_turn,
        ));
        self.transition(Phase::Battle);
        self.started_at = Some(Instant::now());
        self.clock.start();
        info!(room_code = %self.code, first_turn, "battle started");

        for seat in 0..2 {
            let opponent_name = self.seats[opponent(seat)]
                .player()
                .map(|p| p.name.clone())
                .unwrap_or_default();
            let Some(player) = self.seats[seat].player() else {
                continue;
            };
            player.connection.send(ServerMessage::GameStart {
                opponent_name,
                your_turn: seat == first_turn,
                your_player_id: player.id.clone(),
            });
        }
        Ok(())
    }

    /// The acting seat and the running battle, or the rejection to send.
    fn active_battle(
        &mut self,
        player_id: &PlayerId,
    ) -> Result<(usize, &mut Battle), RoomError> {
        let seat = self.seat_of(player_id).ok_or(RoomError::NotInRoom)?;
        if self.phase != Phase::Battle {
            return Err(RoomError::WrongPhase(self.phase));
        }
        let battle = self
            .battle
            .as_mut()
            .ok_or(RoomError::WrongPhase(self.phase))?;
        Ok((seat, battle))
    }

    pub fn shoot(&mut self, player_id: &PlayerId, pos: Position) -> Result<(), RoomError> {
        let (seat, battle) = self.active_battle(player_id)?;
        let report = battle.shoot(seat, pos)?;
        self.emit_shot(seat, &report);

        if let Some(victory) = report.victory {
            self.finish(victory);
        } else if report.ends_turn() {
            self.pass_turn();
        } else {
            self.clock.reset();
        }
        Ok(())
    }

    fn emit_shot(&self, seat: usize, report: &ShotReport) {
        let summary = report.summary();
        self.send_seat(
            seat,
            ServerMessage::TurnResult {
                x: report.position.x,
                y: report.position.y,
                hit: summary.hit,
                armor_hit: summary.armor_hit,
                sunk: report.sunk_ship.is_some(),
                sunk_ship: report.sunk_ship.clone(),
                mine_hit: summary.mine_hit,
                adjacent_count: report.adjacent_count,
                game_over: report.victory.is_some(),
                winner: report.victory.and_then(|v| self.player_id_at(v.winner)),
            },
        );
        self.send_seat(
            opponent(seat),
            ServerMessage::OpponentAction {
                kind: OpponentActionKind::Shoot,
                position: report.position,
                result: Some(summary),
            },
        );
    }

    pub fn scan(&mut self, player_id: &PlayerId, pos: Position) -> Result<(), RoomError> {
        let (seat, battle) = self.active_battle(player_id)?;
        let ScanReport { position, has_ships } = battle.scan(seat, pos)?;
        self.send_seat(
            seat,
            ServerMessage::ScanResult {
                x: position.x,
                y: position.y,
                has_ships,
            },
        );
        self.send_seat(
            opponent(seat),
            ServerMessage::OpponentAction {
                kind: OpponentActionKind::Scan,
                position,
                result: None,
            },
        );
        Ok(())
    }

    pub fn scout(&mut self, player_id: &PlayerId, pos: Position) -> Result<(), RoomError> {
        let (seat, battle) = self.active_battle(player_id)?;
        let ScoutReport {
            position,
            reveal_turn,
        } = battle.scout(seat, pos)?;
        self.send_seat(
            seat,
            ServerMessage::ScoutSent {
                x: position.x,
                y: position.y,
                reveal_turn,
            },
        );
        Ok(())
    }

    pub fn flag(&mut self, player_id: &PlayerId, pos: Position) -> Result<(), RoomError> {
        let (seat, battle) = self.active_battle(player_id)?;
        let FlagReport {
            position,
            success,
            was_ship,
            life_gained,
            lives,
        } = battle.flag(seat, pos)?;
        self.send_seat(
            seat,
            ServerMessage::FlagResult {
                x: position.x,
                y: position.y,
                success,
                was_ship,
                life_gained,
                lives,
            },
        );
        self.send_seat(
            opponent(seat),
            ServerMessage::OpponentAction {
                kind: OpponentActionKind::Flag,
                position,
                result: None,
            },
        );
        self.pass_turn();
        Ok(())
    }

    /// Relocates one of the player's own ships and ends the turn. The mover
    /// gets a fresh `SyncState` showing the new layout.
    pub fn move_ship(
        &mut self,
        player_id: &PlayerId,
        ship_id: &ShipId,
        origin: Position,
        orientation: Orientation,
    ) -> Result<(), RoomError> {
        let (seat, battle) = self.active_battle(player_id)?;
        let report = battle.move_ship(seat, ship_id, origin, orientation)?;
        debug!(
            room_code = %self.code,
            %player_id,
            ship_id = %report.ship_id,
            origin = %report.origin,
            "ship moved"
        );
        let sync = self.sync_state(seat);
        self.send_seat(seat, sync);
        self.pass_turn();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Turn flow
    // -----------------------------------------------------------------------

    /// Counts the clock down by one step. At zero the turn is skipped.
    pub fn on_clock_tick(&mut self, tick: ClockTick) {
        let Some(left) = self.clock.consume(tick) else {
            return;
        };
        self.dispatch(
            Recipient::All,
            ServerMessage::TimerUpdate {
                turn_time_left: left,
                game_time_elapsed: self.game_time_elapsed(),
            },
        );
        if left == 0 && self.phase == Phase::Battle {
            info!(room_code = %self.code, "turn timed out, skipping");
            self.pass_turn();
        }
    }

    /// Waits for the next clock step. Pends while the clock is not running.
    pub async fn wait_for_clock(&mut self) -> ClockTick {
        self.clock.wait_for_tick().await
    }

    fn pass_turn(&mut self) {
        let Some(battle) = self.battle.as_mut() else {
            return;
        };
        let TurnAdvance {
            current_turn,
            turn_number,
            reveals,
        } = battle.advance_turn();
        debug!(room_code = %self.code, current_turn, turn = turn_number, "turn changed");

        for seat in 0..2 {
            self.send_seat(
                seat,
                ServerMessage::TurnChanged {
                    current_turn: current_turn as u8,
                    turn_number,
                    your_turn: seat == current_turn,
                },
            );
        }
        for scout in reveals {
            self.send_seat(
                scout.owner,
                ServerMessage::ScoutResult {
                    x: scout.position.x,
                    y: scout.position.y,
                    cell_info: scout.info,
                },
            );
        }
        self.clock.reset();
    }

    fn finish(&mut self, victory: Victory) {
        self.transition(Phase::Finished);
        self.clock.stop();
        let Some(battle) = self.battle.as_ref() else {
            return;
        };
        let stats = battle.stats().clone();
        let Some(winner) = self.seats[victory.winner].player() else {
            warn!(room_code = %self.code, "winner seat is empty");
            return;
        };
        info!(
            room_code = %self.code,
            winner = %winner.id,
            reason = ?victory.reason,
            turns = stats.total_turns,
            "game over"
        );
        let msg = ServerMessage::GameOver {
            winner: winner.id.clone(),
            winner_name: winner.name.clone(),
            reason: victory.reason,
            stats,
        };
        self.dispatch(Recipient::All, msg);
    }

    fn game_time_elapsed(&self) -> u64 {
        self.started_at.map_or(0, |t| t.elapsed().as_secs())
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Full state for the player in `seat`: their own board in the clear,
    /// the opponent's board masked.
    pub fn sync_state(&self, seat: usize) -> ServerMessage {
        let size = self.config.rules.board_size;
        let board_of = |index: usize| -> Option<&Board> {
            match &self.battle {
                Some(battle) => Some(battle.combatant(index).board()),
                None => self.seats[index].player()?.placement.as_ref(),
            }
        };

        let your_board = board_of(seat).map_or_else(|| BoardView::empty(size), Board::owner_view);
        let opponent_board = match &self.battle {
            Some(battle) => battle.combatant(opponent(seat)).board().masked_view(),
            None => BoardView::empty(size),
        };

        let players = (0..2)
            .filter_map(|index| {
                let player = self.seats[index].player()?;
                Some(self.player_view(index, player))
            })
            .collect();

        let game_state = GameStateView {
            room_code: self.code.clone(),
            phase: self.phase,
            players,
            current_turn: self.battle.as_ref().map_or(0, |b| b.current_turn() as u8),
            turn_number: self.battle.as_ref().map_or(0, Battle::turn_number),
            turn_time_left: if self.battle.is_some() {
                self.clock.remaining()
            } else {
                0
            },
            game_time_elapsed: self.game_time_elapsed(),
            winner: self
                .battle
                .as_ref()
                .and_then(Battle::victory)
                .and_then(|v| self.player_id_at(v.winner)),
            pending_scouts: self
                .battle
                .as_ref()
                .map(|b| b.pending_scouts_for(seat))
                .unwrap_or_default(),
        };

        ServerMessage::SyncState {
            game_state,
            your_board,
            opponent_board,
        }
    }

    fn player_view(&self, seat: usize, player: &Player) -> PlayerView {
        let rules = &self.config.rules;
        let mut view = PlayerView {
            id: player.id.clone(),
            name: player.name.clone(),
            seat: seat as u8,
            connected: player.is_connected(),
            ready: player.ready,
            lives: rules.max_lives,
            scouts_remaining: rules.max_scouts,
            last_scan_turn: None,
            last_scout_turn: None,
            scan_cooldown: 0,
            scout_cooldown: 0,
            armors_placed: player
                .placement
                .as_ref()
                .map_or(0, |board| board.armors_placed() as u8),
        };
        if let Some(battle) = &self.battle {
            let combatant = battle.combatant(seat);
            view.lives = combatant.lives();
            view.scouts_remaining = combatant.scouts_remaining();
            view.last_scan_turn = combatant.last_scan_turn();
            view.last_scout_turn = combatant.last_scout_turn();
            view.scan_cooldown = battle.cooldown_remaining(seat, Ability::Scan);
            view.scout_cooldown = battle.cooldown_remaining(seat, Ability::Scout);
            view.armors_placed = combatant.board().armors_placed() as u8;
        }
        view
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: Phase) {
        if next == self.phase {
            return;
        }
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal phase change {} -> {}",
            self.phase,
            next
        );
        debug!(room_code = %self.code, from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }

    fn player_id_at(&self, seat: usize) -> Option<PlayerId> {
        self.seats[seat].player().map(|p| p.id.clone())
    }

    fn send_seat(&self, seat: usize, msg: ServerMessage) {
        if let Some(player) = self.seats[seat].player() {
            player.connection.send(msg);
        }
    }

    /// Delivers a message to the seated players selected by `recipient`.
    pub fn dispatch(&self, recipient: Recipient, msg: ServerMessage) {
        for player in self.players() {
            let wanted = match &recipient {
                Recipient::All => true,
                Recipient::Player(id) => &player.id == id,
                Recipient::AllExcept(id) => &player.id != id,
            };
            if wanted {
                player.connection.send(msg.clone());
            }
        }
    }
}
