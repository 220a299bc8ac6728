//! Room state machine tests, driven directly without the actor.

use std::time::Duration;

use seasapper_clock::{ClockConfig, ClockState};
use seasapper_game::{ActionError, GameConfig, MoveError};
use seasapper_protocol::{
    ClientMessage, ConnectionId, ErrorCode, FleetPlacement, GameOverReason,
    OpponentActionKind, Orientation, Phase, PlayerId, Position, RoomClosedReason,
    RoomCode, ServerMessage, ShipId, ShipPlacement,
};
use seasapper_room::{Connection, Room, RoomConfig, RoomError};
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

struct Client {
    id: PlayerId,
    conn: ConnectionId,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Client {
    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }
}

fn ship(id: &str, size: u8, x: i32, y: i32) -> ShipPlacement {
    ShipPlacement {
        id: ShipId::new(id),
        size,
        origin: Position::new(x, y),
        orientation: Orientation::Horizontal,
    }
}

fn standard_fleet() -> FleetPlacement {
    FleetPlacement {
        ships: vec![
            ship("s4", 4, 0, 0),
            ship("s3a", 3, 5, 0),
            ship("s3b", 3, 0, 2),
            ship("s2a", 2, 4, 2),
            ship("s2b", 2, 7, 2),
            ship("s2c", 2, 0, 4),
            ship("s1a", 1, 3, 4),
            ship("s1b", 1, 5, 4),
            ship("s1c", 1, 7, 4),
            ship("s1d", 1, 9, 4),
        ],
        mines: [(0, 7), (2, 7), (4, 7), (6, 7), (8, 7), (1, 9), (3, 9), (5, 9), (7, 9)]
            .into_iter()
            .map(|(x, y)| Position::new(x, y))
            .collect(),
        armor: Vec::new(),
    }
}

fn ship_cells(fleet: &FleetPlacement) -> Vec<Position> {
    fleet
        .ships
        .iter()
        .flat_map(|s| (0..s.size as i32).map(move |i| s.origin.offset(i, 0)))
        .collect()
}

fn config() -> RoomConfig {
    RoomConfig {
        clock: ClockConfig {
            turn_time_secs: 3,
            tick_interval: Duration::from_secs(1),
        },
        reconnect_grace: Duration::from_secs(60),
        channel_size: 16,
        rules: GameConfig::default(),
    }
}

fn connect(room: &mut Room, name: &str, conn: u64) -> Client {
    let (tx, rx) = mpsc::unbounded_channel();
    let conn = ConnectionId::new(conn);
    let accepted = room
        .join(name.into(), None, Connection::new(conn, tx))
        .expect("join should succeed");
    Client {
        id: accepted.player_id,
        conn,
        rx,
    }
}

fn seated() -> (Room, [Client; 2]) {
    let mut room = Room::new(RoomCode::new("ABCD"), config());
    let a = connect(&mut room, "Ann", 1);
    let b = connect(&mut room, "Bob", 2);
    (room, [a, b])
}

/// Both players placed and ready. Returns the seat that moves first.
fn in_battle() -> (Room, [Client; 2], usize) {
    let (mut room, mut clients) = seated();
    for c in &clients {
        room.submit_placement(&c.id, &standard_fleet()).unwrap();
        room.ready(&c.id).unwrap();
    }
    for c in &mut clients {
        c.drain();
    }
    let first = room.battle().unwrap().current_turn();
    (room, clients, first)
}

fn miss(room: &mut Room, client: &Client, y: i32) {
    room.shoot(&client.id, Position::new(9, y)).unwrap();
}

// =========================================================================
// Joining
// =========================================================================

#[test]
fn test_join_first_player_waits_for_opponent() {
    let mut room = Room::new(RoomCode::new("ABCD"), config());
    let mut a = connect(&mut room, "Ann", 1);

    assert_eq!(room.phase(), Phase::Waiting);
    match a.drain().as_slice() {
        [ServerMessage::RoomJoined {
            seat_number,
            waiting_for_opponent,
            player_id,
            ..
        }] => {
            assert_eq!(*seat_number, 1);
            assert!(*waiting_for_opponent);
            assert_eq!(player_id, &a.id);
        }
        other => panic!("unexpected messages: {other:?}"),
    }
}

#[test]
fn test_join_second_player_starts_placement() {
    let (room, mut clients) = seated();
    assert_eq!(room.phase(), Phase::Placement);

    let a_msgs = clients[0].drain();
    assert!(a_msgs.iter().any(|m| matches!(
        m,
        ServerMessage::OpponentJoined { opponent_name } if opponent_name == "Bob"
    )));
    let b_msgs = clients[1].drain();
    assert!(matches!(
        b_msgs[0],
        ServerMessage::RoomJoined {
            seat_number: 2,
            waiting_for_opponent: false,
            ..
        }
    ));
    assert!(b_msgs.iter().any(|m| matches!(
        m,
        ServerMessage::OpponentJoined { opponent_name } if opponent_name == "Ann"
    )));
}

#[test]
fn test_join_third_player_rejected_room_full() {
    let (mut room, _clients) = seated();
    let (tx, _rx) = mpsc::unbounded_channel();
    let err = room
        .join("Cid".into(), None, Connection::new(ConnectionId::new(3), tx))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::RoomFull);
    assert_eq!(room.occupied_seats(), 2);
}

#[test]
fn test_handle_intent_join_while_seated_rejected() {
    let (mut room, clients) = seated();
    let err = room
        .handle_intent(
            &clients[0].id,
            ClientMessage::Join {
                room_code: RoomCode::new("ZZZZ"),
                display_name: "Ann".into(),
                player_id: None,
            },
        )
        .unwrap_err();
    assert_eq!(err, RoomError::AlreadyInRoom);
}

// =========================================================================
// Placement
// =========================================================================

#[test]
fn test_submit_placement_extreme_origin_invalid_placement() {
    let (mut room, clients) = seated();
    let mut fleet = standard_fleet();
    fleet.ships[0].origin = Position::new(i32::MAX, 0);
    let err = room.submit_placement(&clients[0].id, &fleet).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidPlacement);
    assert!(room.seat(0).player().unwrap().placement.is_none());
}

#[test]
fn test_submit_placement_invalid_fleet_rejected() {
    let (mut room, clients) = seated();
    let mut fleet = standard_fleet();
    fleet.mines.pop();
    let err = room.submit_placement(&clients[0].id, &fleet).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidPlacement);
}

#[test]
fn test_submit_placement_resubmission_replaces_board() {
    let (mut room, clients) = seated();
    let id = &clients[0].id;
    room.submit_placement(id, &standard_fleet()).unwrap();

    let mut moved = standard_fleet();
    moved.ships[9] = ship("s1d", 1, 9, 6);
    room.submit_placement(id, &moved).unwrap();

    let mut broken = moved.clone();
    broken.mines.pop();
    assert!(room.submit_placement(id, &broken).is_err());

    let board = room.seat(0).player().unwrap().placement.as_ref().unwrap();
    assert_eq!(
        board.ship_at(Position::new(9, 6)).map(|s| s.id.clone()),
        Some(ShipId::new("s1d"))
    );
    assert!(board.ship_at(Position::new(9, 4)).is_none());
}

#[test]
fn test_ready_without_placement_rejected() {
    let (mut room, clients) = seated();
    assert_eq!(room.ready(&clients[0].id), Err(RoomError::NoPlacement));
}

#[test]
fn test_submit_placement_outside_placement_phase_rejected() {
    let mut room = Room::new(RoomCode::new("ABCD"), config());
    let a = connect(&mut room, "Ann", 1);
    assert_eq!(
        room.submit_placement(&a.id, &standard_fleet()),
        Err(RoomError::WrongPhase(Phase::Waiting))
    );
}

#[test]
fn test_ready_both_players_starts_battle() {
    let (mut room, mut clients) = seated();
    for c in &clients {
        room.submit_placement(&c.id, &standard_fleet()).unwrap();
    }
    room.ready(&clients[0].id).unwrap();
    assert_eq!(room.phase(), Phase::Placement);
    room.ready(&clients[1].id).unwrap();

    assert_eq!(room.phase(), Phase::Battle);
    assert_eq!(room.clock().state(), ClockState::Running);
    let first = room.battle().unwrap().current_turn();

    let mut your_turns = 0;
    for (seat, c) in clients.iter_mut().enumerate() {
        let start = c
            .drain()
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::GameStart {
                    your_turn,
                    your_player_id,
                    ..
                } => Some((your_turn, your_player_id)),
                _ => None,
            })
            .expect("GameStart");
        assert_eq!(start.1, c.id);
        assert_eq!(start.0, seat == first);
        your_turns += start.0 as usize;
    }
    assert_eq!(your_turns, 1);
}

#[test]
fn test_shoot_during_placement_wrong_phase() {
    let (mut room, clients) = seated();
    let err = room.shoot(&clients[0].id, Position::new(0, 0)).unwrap_err();
    assert_eq!(err, RoomError::WrongPhase(Phase::Placement));
    assert_eq!(err.code(), ErrorCode::WrongPhase);
}

// =========================================================================
// Battle
// =========================================================================

#[test]
fn test_shoot_miss_passes_turn() {
    let (mut room, mut clients, first) = in_battle();
    let second = 1 - first;
    miss(&mut room, &clients[first], 9);

    let battle = room.battle().unwrap();
    assert_eq!(battle.current_turn(), second);
    assert_eq!(battle.turn_number(), 2);

    let shooter = clients[first].drain();
    assert!(matches!(
        shooter[0],
        ServerMessage::TurnResult { hit: false, game_over: false, .. }
    ));
    assert!(shooter.iter().any(|m| matches!(
        m,
        ServerMessage::TurnChanged { your_turn: false, turn_number: 2, .. }
    )));

    let victim = clients[second].drain();
    assert!(matches!(
        &victim[0],
        ServerMessage::OpponentAction {
            kind: OpponentActionKind::Shoot,
            result: Some(summary),
            ..
        } if !summary.hit
    ));
    assert!(victim.iter().any(|m| matches!(
        m,
        ServerMessage::TurnChanged { your_turn: true, .. }
    )));
}

#[test]
fn test_shoot_hit_keeps_turn() {
    let (mut room, mut clients, first) = in_battle();
    room.shoot(&clients[first].id, Position::new(9, 4)).unwrap();

    assert_eq!(room.battle().unwrap().current_turn(), first);
    let msgs = clients[first].drain();
    assert!(matches!(
        &msgs[0],
        ServerMessage::TurnResult { hit: true, sunk: true, sunk_ship: Some(ship), .. }
            if ship.id == ShipId::new("s1d")
    ));
    assert!(!msgs.iter().any(|m| matches!(m, ServerMessage::TurnChanged { .. })));
}

#[test]
fn test_shoot_out_of_turn_rejected() {
    let (mut room, clients, first) = in_battle();
    let err = room
        .shoot(&clients[1 - first].id, Position::new(0, 0))
        .unwrap_err();
    assert_eq!(err, RoomError::Action(ActionError::NotYourTurn));
    assert_eq!(err.code(), ErrorCode::NotYourTurn);
}

#[test]
fn test_shoot_same_cell_twice_rejected() {
    let (mut room, clients, first) = in_battle();
    let second = 1 - first;
    miss(&mut room, &clients[first], 9);
    miss(&mut room, &clients[second], 9);
    let err = room
        .shoot(&clients[first].id, Position::new(9, 9))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadyShot);
}

#[test]
fn test_shoot_off_board_rejected() {
    let (mut room, clients, first) = in_battle();
    let err = room
        .shoot(&clients[first].id, Position::new(10, 0))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidPosition);
}

#[test]
fn test_shoot_every_ship_cell_wins_game() {
    let (mut room, mut clients, first) = in_battle();
    for pos in ship_cells(&standard_fleet()) {
        room.shoot(&clients[first].id, pos).unwrap();
    }

    assert_eq!(room.phase(), Phase::Finished);
    assert_eq!(room.clock().state(), ClockState::Stopped);

    let winner_id = clients[first].id.clone();
    let shooter = clients[first].drain();
    assert!(shooter.iter().any(|m| matches!(
        m,
        ServerMessage::TurnResult { game_over: true, winner: Some(w), .. } if *w == winner_id
    )));
    for c in &mut clients {
        let over = c
            .drain()
            .into_iter()
            .chain(if c.id == winner_id { shooter.clone() } else { Vec::new() })
            .find_map(|m| match m {
                ServerMessage::GameOver { winner, reason, stats, .. } => {
                    Some((winner, reason, stats))
                }
                _ => None,
            })
            .expect("GameOver");
        assert_eq!(over.0, winner_id);
        assert_eq!(over.1, GameOverReason::ShipsDestroyed);
        assert_eq!(over.2.ships_destroyed[first], 10);
    }

    let err = room.shoot(&clients[first].id, Position::new(9, 9)).unwrap_err();
    assert_eq!(err, RoomError::WrongPhase(Phase::Finished));
}

#[test]
fn test_shoot_third_mine_loses_game() {
    let (mut room, mut clients, first) = in_battle();
    let second = 1 - first;
    for (i, x) in [0, 2, 4].into_iter().enumerate() {
        let report = room.shoot(&clients[first].id, Position::new(x, 7));
        assert!(report.is_ok());
        if i < 2 {
            assert_eq!(room.battle().unwrap().combatant(first).lives(), 2 - i as u8);
            miss(&mut room, &clients[second], 9 - i as i32);
        }
    }

    assert_eq!(room.phase(), Phase::Finished);
    let loser_msgs = clients[first].drain();
    let over = loser_msgs
        .iter()
        .find_map(|m| match m {
            ServerMessage::GameOver { winner, reason, .. } => Some((winner.clone(), *reason)),
            _ => None,
        })
        .expect("GameOver");
    assert_eq!(over, (clients[second].id.clone(), GameOverReason::LivesDepleted));
}

#[test]
fn test_scan_reports_ships_and_keeps_turn() {
    let (mut room, mut clients, first) = in_battle();
    room.scan(&clients[first].id, Position::new(1, 1)).unwrap();

    assert_eq!(room.battle().unwrap().current_turn(), first);
    assert!(matches!(
        clients[first].drain()[0],
        ServerMessage::ScanResult { x: 1, y: 1, has_ships: true }
    ));
    assert!(matches!(
        clients[1 - first].drain()[0],
        ServerMessage::OpponentAction {
            kind: OpponentActionKind::Scan,
            result: None,
            ..
        }
    ));

    let err = room.scan(&clients[first].id, Position::new(8, 8)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Cooldown);
}

#[test]
fn test_scout_reveals_on_scheduled_turn() {
    let (mut room, mut clients, first) = in_battle();
    let second = 1 - first;
    room.scout(&clients[first].id, Position::new(0, 0)).unwrap();
    assert!(matches!(
        clients[first].drain()[0],
        ServerMessage::ScoutSent { x: 0, y: 0, reveal_turn: 3 }
    ));
    assert!(clients[second].drain().is_empty());

    miss(&mut room, &clients[first], 9);
    assert!(!clients[first]
        .drain()
        .iter()
        .any(|m| matches!(m, ServerMessage::ScoutResult { .. })));

    miss(&mut room, &clients[second], 9);
    let reveal = clients[first]
        .drain()
        .into_iter()
        .find_map(|m| match m {
            ServerMessage::ScoutResult { x, y, cell_info } => Some((x, y, cell_info)),
            _ => None,
        })
        .expect("ScoutResult");
    assert_eq!((reveal.0, reveal.1), (0, 0));
    assert!(reveal.2.has_ship);
    assert!(!clients[second]
        .drain()
        .iter()
        .any(|m| matches!(m, ServerMessage::ScoutResult { .. })));
}

#[test]
fn test_flag_mine_restores_life_and_passes_turn() {
    let (mut room, mut clients, first) = in_battle();
    let second = 1 - first;
    room.shoot(&clients[first].id, Position::new(0, 7)).unwrap();
    miss(&mut room, &clients[second], 9);
    clients[first].drain();

    room.flag(&clients[first].id, Position::new(2, 7)).unwrap();
    assert!(matches!(
        clients[first].drain()[0],
        ServerMessage::FlagResult {
            success: true,
            was_ship: false,
            life_gained: true,
            lives: 3,
            ..
        }
    ));
    assert_eq!(room.battle().unwrap().current_turn(), second);
    assert!(clients[second].drain().iter().any(|m| matches!(
        m,
        ServerMessage::OpponentAction { kind: OpponentActionKind::Flag, .. }
    )));
}

#[test]
fn test_move_ship_relocates_and_passes_turn() {
    let (mut room, mut clients, first) = in_battle();
    room.handle_intent(
        &clients[first].id,
        ClientMessage::MoveShip {
            ship_id: ShipId::new("s1d"),
            new_origin: Position::new(9, 6),
            new_orientation: Orientation::Vertical,
        },
    )
    .unwrap();

    let board = room.battle().unwrap().combatant(first).board();
    assert_eq!(board.ship_at(Position::new(9, 6)).map(|s| s.id.clone()), Some(ShipId::new("s1d")));
    assert!(board.ship_at(Position::new(9, 4)).is_none());
    assert_eq!(room.battle().unwrap().current_turn(), 1 - first);
    assert!(matches!(
        clients[first].drain()[0],
        ServerMessage::SyncState { .. }
    ));
}

#[test]
fn test_move_ship_onto_mine_rejected() {
    let (mut room, clients, first) = in_battle();
    let err = room
        .move_ship(
            &clients[first].id,
            &ShipId::new("s1d"),
            Position::new(8, 7),
            Orientation::Horizontal,
        )
        .unwrap_err();
    assert_eq!(
        err,
        RoomError::Action(ActionError::MoveFailed(MoveError::OnMine(Position::new(8, 7))))
    );
    assert_eq!(err.code(), ErrorCode::MoveFailed);
    assert_eq!(room.battle().unwrap().current_turn(), first);
}

// =========================================================================
// Disconnect and reconnect
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_disconnect_during_battle_pauses_and_notifies() {
    let (mut room, mut clients, _first) = in_battle();
    let (id, conn) = (clients[0].id.clone(), clients[0].conn);
    room.disconnect(&id, conn);

    assert_eq!(room.phase(), Phase::Waiting);
    assert_eq!(room.clock().state(), ClockState::Paused);
    assert!(room.grace_deadline().is_some());
    assert!(matches!(
        &clients[1].drain()[0],
        ServerMessage::OpponentDisconnected { opponent_name } if opponent_name == "Ann"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_by_player_id_restores_battle() {
    let (mut room, mut clients, first) = in_battle();
    for _ in 0..2 {
        let tick = room.wait_for_clock().await;
        room.on_clock_tick(tick);
    }
    assert_eq!(room.clock().remaining(), 1);

    let (id, conn) = (clients[0].id.clone(), clients[0].conn);
    room.disconnect(&id, conn);
    clients[1].drain();

    // Time spent disconnected does not count against the turn.
    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(room.clock().remaining(), 1);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let accepted = room
        .join("Renamed".into(), Some(id.clone()), Connection::new(ConnectionId::new(7), tx))
        .unwrap();
    assert!(accepted.reattached);
    assert_eq!(accepted.player_id, id);
    assert_eq!(accepted.seat, 0);

    assert_eq!(room.phase(), Phase::Battle);
    assert_eq!(room.clock().state(), ClockState::Running);
    assert_eq!(room.clock().remaining(), 1);
    assert!(room.grace_deadline().is_none());
    assert_eq!(room.battle().unwrap().current_turn(), first);

    assert!(matches!(rx.try_recv(), Ok(ServerMessage::RoomJoined { seat_number: 1, .. })));
    match rx.try_recv() {
        Ok(ServerMessage::SyncState { game_state, your_board, .. }) => {
            assert_eq!(game_state.phase, Phase::Battle);
            assert_eq!(game_state.turn_time_left, 1);
            assert_eq!(game_state.players.len(), 2);
            assert_eq!(your_board.ships.len(), 10);
        }
        other => panic!("expected SyncState, got {other:?}"),
    }
    assert!(matches!(
        &clients[1].drain()[0],
        ServerMessage::OpponentReconnected { opponent_name } if opponent_name == "Ann"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_by_name_restores_placement() {
    let (mut room, mut clients) = seated();
    room.submit_placement(&clients[1].id, &standard_fleet()).unwrap();
    let (id, conn) = (clients[1].id.clone(), clients[1].conn);
    room.disconnect(&id, conn);
    assert_eq!(room.phase(), Phase::Waiting);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let accepted = room
        .join("Bob".into(), None, Connection::new(ConnectionId::new(9), tx))
        .unwrap();
    assert_eq!(accepted.player_id, id);
    assert_eq!(room.phase(), Phase::Placement);

    let msgs: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert!(msgs.iter().any(|m| matches!(
        m,
        ServerMessage::SyncState { your_board, .. } if your_board.ships.len() == 10
    )));
    clients[0].drain();
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_from_replaced_connection_ignored() {
    let (mut room, clients) = seated();
    let id = clients[0].id.clone();
    let (tx, _rx) = mpsc::unbounded_channel();
    room.join("Ann".into(), Some(id.clone()), Connection::new(ConnectionId::new(5), tx))
        .unwrap();

    room.disconnect(&id, clients[0].conn);
    assert_eq!(room.connected_players(), 2);
    assert_eq!(room.phase(), Phase::Placement);
    assert!(room.grace_deadline().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_grace_expiry_closes_room() {
    let (mut room, mut clients, _first) = in_battle();
    let (id, conn) = (clients[0].id.clone(), clients[0].conn);
    room.disconnect(&id, conn);
    clients[1].drain();

    tokio::time::advance(Duration::from_secs(59)).await;
    room.on_grace_expired();
    assert_eq!(room.phase(), Phase::Waiting);

    tokio::time::advance(Duration::from_secs(2)).await;
    room.on_grace_expired();
    assert_eq!(room.phase(), Phase::Finished);
    assert_eq!(room.occupied_seats(), 0);
    assert!(room.battle().is_none());
    assert!(matches!(
        clients[1].drain()[0],
        ServerMessage::RoomClosed { reason: RoomClosedReason::Timeout, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_grace_window_runs_from_each_players_own_disconnect() {
    let (mut room, mut clients, _first) = in_battle();
    let (ann, ann_conn) = (clients[0].id.clone(), clients[0].conn);
    let (bob, bob_conn) = (clients[1].id.clone(), clients[1].conn);

    room.disconnect(&ann, ann_conn);
    tokio::time::advance(Duration::from_secs(50)).await;
    room.disconnect(&bob, bob_conn);
    let bob_gone_at = tokio::time::Instant::now();
    tokio::time::advance(Duration::from_secs(5)).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    room.join("Ann".into(), Some(ann.clone()), Connection::new(ConnectionId::new(8), tx))
        .unwrap();
    assert_eq!(room.phase(), Phase::Waiting);
    assert_eq!(
        room.grace_deadline(),
        Some(bob_gone_at + Duration::from_secs(60))
    );

    // Past Ann's original window, inside Bob's.
    tokio::time::advance(Duration::from_secs(6)).await;
    room.on_grace_expired();
    assert_eq!(room.phase(), Phase::Waiting);
    assert_eq!(room.occupied_seats(), 2);

    tokio::time::advance(Duration::from_secs(50)).await;
    room.on_grace_expired();
    assert_eq!(room.phase(), Phase::Finished);
    assert_eq!(room.occupied_seats(), 0);
    assert!(std::iter::from_fn(|| rx.try_recv().ok()).any(|m| matches!(
        m,
        ServerMessage::RoomClosed { reason: RoomClosedReason::Timeout, .. }
    )));
    clients[1].drain();
}

#[tokio::test(start_paused = true)]
async fn test_lone_player_reconnect_clears_grace() {
    let mut room = Room::new(RoomCode::new("SOLO"), config());
    let a = connect(&mut room, "Ann", 1);
    room.disconnect(&a.id, a.conn);
    assert!(room.grace_deadline().is_some());

    let (tx, _rx) = mpsc::unbounded_channel();
    room.join("Ann".into(), Some(a.id.clone()), Connection::new(ConnectionId::new(2), tx))
        .unwrap();
    assert!(room.grace_deadline().is_none());
    assert_eq!(room.phase(), Phase::Waiting);
}

// =========================================================================
// Leaving and reuse
// =========================================================================

#[test]
fn test_leave_closes_room_for_opponent() {
    let (mut room, mut clients) = seated();
    room.handle_intent(&clients[0].id, ClientMessage::LeaveRoom).unwrap();

    assert_eq!(room.phase(), Phase::Finished);
    assert_eq!(room.occupied_seats(), 0);
    assert!(clients[1].drain().iter().any(|m| matches!(
        m,
        ServerMessage::RoomClosed { reason: RoomClosedReason::Left, .. }
    )));
    assert!(!clients[0]
        .drain()
        .iter()
        .any(|m| matches!(m, ServerMessage::RoomClosed { .. })));
}

#[test]
fn test_join_vacant_finished_room_starts_fresh() {
    let (mut room, clients) = seated();
    room.leave(&clients[0].id).unwrap();
    assert_eq!(room.phase(), Phase::Finished);

    let _c = connect(&mut room, "Cid", 3);
    assert_eq!(room.phase(), Phase::Waiting);
    assert_eq!(room.occupied_seats(), 1);
}

#[test]
fn test_leave_when_not_seated_rejected() {
    let (mut room, _clients) = seated();
    assert_eq!(
        room.leave(&PlayerId::new("nobody")),
        Err(RoomError::NotInRoom)
    );
}

// =========================================================================
// Turn clock
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_clock_timeout_skips_turn() {
    let (mut room, mut clients, first) = in_battle();
    let mut left = Vec::new();
    for _ in 0..3 {
        let tick = room.wait_for_clock().await;
        room.on_clock_tick(tick);
    }
    for m in clients[first].drain() {
        if let ServerMessage::TimerUpdate { turn_time_left, .. } = m {
            left.push(turn_time_left);
        }
    }
    assert_eq!(left, vec![2, 1, 0]);
    assert_eq!(room.battle().unwrap().current_turn(), 1 - first);
    assert_eq!(room.clock().remaining(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_clock_tick_from_previous_turn_ignored() {
    let (mut room, mut clients, first) = in_battle();
    let stale = room.wait_for_clock().await;
    miss(&mut room, &clients[first], 9);
    clients[0].drain();
    clients[1].drain();

    room.on_clock_tick(stale);
    assert_eq!(room.clock().remaining(), 3);
    assert!(clients[0].drain().is_empty());
    assert!(clients[1].drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hit_resets_turn_timer() {
    let (mut room, _clients, first) = in_battle();
    let tick = room.wait_for_clock().await;
    room.on_clock_tick(tick);
    assert_eq!(room.clock().remaining(), 2);

    let shooter = room.seat(first).player().unwrap().id.clone();
    room.shoot(&shooter, Position::new(0, 0)).unwrap();
    assert_eq!(room.clock().remaining(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_sync_state_masks_opponent_board() {
    let (mut room, _clients, first) = in_battle();
    let shooter = room.seat(first).player().unwrap().id.clone();
    room.shoot(&shooter, Position::new(9, 9)).unwrap();

    match room.sync_state(first) {
        ServerMessage::SyncState {
            game_state,
            your_board,
            opponent_board,
        } => {
            assert_eq!(game_state.turn_number, 2);
            assert_eq!(your_board.ships.len(), 10);
            assert!(opponent_board.ships.is_empty());
            assert!(opponent_board.mines.is_empty());
            assert!(opponent_board.cells[9][9].revealed);
            assert!(!opponent_board.cells[0][0].revealed);
        }
        other => panic!("unexpected {other:?}"),
    }
}
