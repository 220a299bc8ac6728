//! Room actor: one Tokio task per room.
//!
//! The task owns the [`Room`] and is the only thing that ever touches it.
//! Commands arrive over a bounded mpsc channel and are applied one at a
//! time, interleaved with clock ticks and the reconnect-grace deadline in
//! a single `select!` loop. A tick or deadline therefore can never race a
//! player's intent.

use std::panic::{AssertUnwindSafe, catch_unwind};

use seasapper_protocol::{
    ClientMessage, ConnectionId, Phase, PlayerId, RoomClosedReason, RoomCode,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

use crate::room::{JoinAccepted, Room};
use crate::seat::Connection;
use crate::{RoomConfig, RoomError};

pub(crate) enum RoomCommand {
    Join {
        name: String,
        player_id: Option<PlayerId>,
        connection: Connection,
        reply: oneshot::Sender<Result<JoinAccepted, RoomError>>,
    },

    /// Any client message from a seated player.
    Intent {
        player_id: PlayerId,
        msg: ClientMessage,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// The player's socket went away. Fire-and-forget.
    Disconnect {
        player_id: PlayerId,
        connection_id: ConnectionId,
    },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    /// Close the room and stop the task.
    Shutdown {
        reason: RoomClosedReason,
    },
}

/// Room metadata, for the registry and for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: Phase,
    pub occupied_seats: usize,
    pub connected_players: usize,
    /// A disconnected player still has time to come back.
    pub grace_pending: bool,
}

impl RoomInfo {
    /// Nobody is connected and nobody is expected back.
    pub fn is_idle(&self) -> bool {
        self.connected_players == 0 && !self.grace_pending
    }
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn join(
        &self,
        name: String,
        player_id: Option<PlayerId>,
        connection: Connection,
    ) -> Result<JoinAccepted, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            name,
            player_id,
            connection,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Applies a client message and waits for the verdict.
    pub async fn intent(
        &self,
        player_id: PlayerId,
        msg: ClientMessage,
    ) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Intent {
            player_id,
            msg,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn disconnect(
        &self,
        player_id: PlayerId,
        connection_id: ConnectionId,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Disconnect {
            player_id,
            connection_id,
        })
        .await
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    pub async fn shutdown(&self, reason: RoomClosedReason) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown { reason }).await
    }

    /// Resolves once the actor has stopped.
    pub async fn stopped(&self) {
        self.sender.closed().await;
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }
}

struct RoomActor {
    room: Room,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        let code = self.room.code().clone();
        tracing::info!(room_code = %code, "room actor started");

        loop {
            let deadline = self.room.grace_deadline();
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else {
                        tracing::debug!(room_code = %code, "all handles dropped");
                        break;
                    };
                    if !self.handle(cmd) {
                        break;
                    }
                }
                tick = self.room.wait_for_clock() => {
                    self.room.on_clock_tick(tick);
                }
                () = grace_expiry(deadline) => {
                    self.room.on_grace_expired();
                }
            }
        }

        tracing::info!(room_code = %code, "room actor stopped");
    }

    /// Applies one command. Returns `false` when the actor should stop.
    fn handle(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                name,
                player_id,
                connection,
                reply,
            } => {
                let result = self.guarded("join", |room| room.join(name, player_id, connection));
                let _ = reply.send(result);
            }
            RoomCommand::Intent {
                player_id,
                msg,
                reply,
            } => {
                let kind = msg.kind();
                let result = self.guarded(kind, |room| room.handle_intent(&player_id, msg));
                if let Err(err) = &result {
                    tracing::debug!(
                        room_code = %self.room.code(),
                        %player_id,
                        kind,
                        %err,
                        "intent rejected"
                    );
                }
                let _ = reply.send(result);
            }
            RoomCommand::Disconnect {
                player_id,
                connection_id,
            } => {
                let _ = self.guarded("disconnect", |room| {
                    room.disconnect(&player_id, connection_id);
                    Ok(())
                });
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown { reason } => {
                tracing::info!(room_code = %self.room.code(), ?reason, "room shutting down");
                self.room.close(reason);
                return false;
            }
        }
        true
    }

    /// Runs `f` against the room, turning a panic into
    /// [`RoomError::Internal`] so the room keeps serving.
    fn guarded<T>(
        &mut self,
        what: &str,
        f: impl FnOnce(&mut Room) -> Result<T, RoomError>,
    ) -> Result<T, RoomError> {
        let room = &mut self.room;
        match catch_unwind(AssertUnwindSafe(|| f(room))) {
            Ok(result) => result,
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_owned())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_owned());
                tracing::error!(
                    room_code = %self.room.code(),
                    what,
                    %detail,
                    "room handler panicked"
                );
                Err(RoomError::Internal(format!("{what} failed")))
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.room.code().clone(),
            phase: self.room.phase(),
            occupied_seats: self.room.occupied_seats(),
            connected_players: self.room.connected_players(),
            grace_pending: self.room.grace_deadline().is_some(),
        }
    }
}

/// Resolves at `deadline`, or never if there is none.
async fn grace_expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Spawns a room actor and returns its handle.
pub fn spawn_room(code: RoomCode, config: RoomConfig) -> RoomHandle {
    let (sender, receiver) = mpsc::channel(config.channel_size.max(1));
    let actor = RoomActor {
        room: Room::new(code.clone(), config),
        receiver,
    };
    tokio::spawn(actor.run());
    RoomHandle { code, sender }
}
