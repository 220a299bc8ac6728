//! Per-connection handler: decode intents, route them to the room, and
//! forward the room's messages back to the socket.
//!
//! Each accepted connection runs this in its own Tokio task:
//!   1. Wait for a `Join` and attach to the room it names
//!   2. Loop: forward client intents to the room, room messages to the client
//!   3. On close, tell the room the player is gone and let the registry
//!      drop the room if nobody is left

use std::sync::Arc;

use seasapper_protocol::{
    ClientMessage, Codec, ErrorCode, PlayerId, RoomCode, ServerMessage,
};
use seasapper_room::{Connection as RoomConnection, RoomHandle};
use seasapper_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::ServerError;
use crate::server::ServerState;

/// Longest accepted room code, after trimming.
const MAX_ROOM_CODE_LEN: usize = 32;

/// Longest accepted display name, after trimming.
const MAX_NAME_LEN: usize = 32;

/// The room this connection is seated in.
struct Membership {
    handle: RoomHandle,
    player_id: PlayerId,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ServerError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (tx, mut outbound) = mpsc::unbounded_channel::<ServerMessage>();
    let mut shutdown = state.shutdown.clone();
    let mut membership: Option<Membership> = None;

    let result = loop {
        tokio::select! {
            incoming = conn.recv() => match incoming {
                Ok(Some(data)) => {
                    if let Err(err) =
                        handle_frame(&conn, &state, &tx, &mut membership, &data).await
                    {
                        break Err(err);
                    }
                }
                Ok(None) => {
                    tracing::debug!(%conn_id, "connection closed cleanly");
                    break Ok(());
                }
                Err(err) => break Err(ServerError::from(err)),
            },
            Some(msg) = outbound.recv() => {
                if matches!(msg, ServerMessage::RoomClosed { .. }) {
                    membership = None;
                }
                if let Err(err) = send(&conn, &state.codec, &msg).await {
                    break Err(err);
                }
            }
            Ok(()) = shutdown.changed() => {
                while let Ok(msg) = outbound.try_recv() {
                    let _ = send(&conn, &state.codec, &msg).await;
                }
                let _ = send(
                    &conn,
                    &state.codec,
                    &ServerMessage::error(ErrorCode::ServerShutdown, "server is shutting down"),
                )
                .await;
                let _ = conn.close().await;
                membership = None;
                break Ok(());
            }
        }
    };

    if let Some(Membership { handle, player_id }) = membership {
        tracing::info!(%conn_id, %player_id, room_code = %handle.code(), "player connection lost");
        if let Err(err) = handle.disconnect(player_id, conn_id).await {
            tracing::debug!(%err, "room already gone");
        }
        let code = handle.code().clone();
        state.registry.lock().await.remove_room_if_empty(&code).await;
    }

    result
}

/// Decodes one frame and acts on it. Rejections are reported to the
/// client; only socket failures end the connection.
async fn handle_frame<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    membership: &mut Option<Membership>,
    data: &[u8],
) -> Result<(), ServerError> {
    let msg: ClientMessage = match state.codec.decode(data) {
        Ok(msg) => msg,
        Err(err) => {
            tracing::debug!(conn_id = %conn.id(), %err, "undecodable frame");
            return send_error(conn, &state.codec, ErrorCode::InvalidData, &err.to_string()).await;
        }
    };

    match msg {
        ClientMessage::Join {
            room_code,
            display_name,
            player_id,
        } => {
            if membership.is_some() {
                return send_error(
                    conn,
                    &state.codec,
                    ErrorCode::AlreadyInRoom,
                    "you already joined a room",
                )
                .await;
            }
            let Some(code) = normalize_room_code(&room_code) else {
                return send_error(conn, &state.codec, ErrorCode::InvalidData, "invalid room code")
                    .await;
            };
            let name = display_name.trim();
            if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
                return send_error(conn, &state.codec, ErrorCode::InvalidData, "invalid display name")
                    .await;
            }

            let handle = state.registry.lock().await.get_or_create_room(&code);
            let attach = RoomConnection::new(conn.id(), tx.clone());
            match handle.join(name.to_owned(), player_id, attach).await {
                Ok(accepted) => {
                    tracing::info!(
                        conn_id = %conn.id(),
                        player_id = %accepted.player_id,
                        room_code = %code,
                        seat = accepted.seat,
                        reattached = accepted.reattached,
                        "connection joined room"
                    );
                    *membership = Some(Membership {
                        handle,
                        player_id: accepted.player_id,
                    });
                }
                Err(err) => {
                    send_error(conn, &state.codec, err.code(), &err.to_string()).await?;
                }
            }
        }
        other => {
            let Some(Membership { handle, player_id }) = membership.as_ref() else {
                return send_error(conn, &state.codec, ErrorCode::NotInRoom, "join a room first")
                    .await;
            };
            let leaving = matches!(other, ClientMessage::LeaveRoom);
            let kind = other.kind();
            match handle.intent(player_id.clone(), other).await {
                Ok(()) if leaving => {
                    let code = handle.code().clone();
                    *membership = None;
                    state.registry.lock().await.remove_room_if_empty(&code).await;
                }
                Ok(()) => {}
                Err(err) => {
                    tracing::debug!(%player_id, kind, %err, "intent rejected");
                    send_error(conn, &state.codec, err.code(), &err.to_string()).await?;
                }
            }
        }
    }
    Ok(())
}

/// Trims and upper-cases a room code. `None` if empty or too long.
pub(crate) fn normalize_room_code(code: &RoomCode) -> Option<RoomCode> {
    let code = code.as_str().trim();
    if code.is_empty() || code.chars().count() > MAX_ROOM_CODE_LEN {
        return None;
    }
    Some(RoomCode::new(code.to_uppercase()))
}

async fn send<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    msg: &ServerMessage,
) -> Result<(), ServerError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}

async fn send_error<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    code: ErrorCode,
    message: &str,
) -> Result<(), ServerError> {
    send(conn, codec, &ServerMessage::error(code, message)).await
}
