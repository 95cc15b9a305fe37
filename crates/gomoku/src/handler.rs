//! Per-connection handler: hello, request dispatch and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `hello` → learn the user id
//!   2. Register with the hub → start the writer task on the queue
//!   3. Loop: receive frames → dispatch to the room service → enqueue reply
//!   4. On exit: unregister, and leave the user's room if no newer
//!      connection has taken over

use std::sync::Arc;

use chrono::Utc;
use gomoku_hub::Registration;
use gomoku_protocol::{
    ClientFrame, Codec, ProtocolError, Reply, Request, ServerFrame, UserId,
};
use gomoku_room::{LeaveOutcome, RoomError};
use gomoku_store::RoomRepository;
use gomoku_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::GomokuError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<R: RoomRepository>(
    conn: WebSocketConnection,
    state: Arc<ServerState<R>>,
) -> Result<(), GomokuError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let user = perform_handshake(&conn, &state).await?;
    tracing::info!(%conn_id, user_id = %user, "user connected");

    let Registration {
        sender, receiver, ..
    } = state.hub.register(user.clone(), conn_id).await;

    let welcome = state.codec.encode(&ServerFrame::Welcome {
        user_id: user.clone(),
        server_time: Utc::now(),
    })?;
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), receiver));

    let result = if sender.send(welcome).await.is_ok() {
        read_loop(&conn, &state, &user, &sender).await
    } else {
        Ok(())
    };

    // Cleanup runs whatever the read loop returned.
    let current = state.hub.unregister(&user, conn_id).await;
    if current {
        match state.service.leave_current(&user).await {
            Ok(LeaveOutcome::NotMember) => {}
            Ok(_) => tracing::info!(user_id = %user, "left room on disconnect"),
            Err(e) => tracing::warn!(user_id = %user, error = %e, "leave on disconnect failed"),
        }
    } else {
        tracing::debug!(user_id = %user, %conn_id, "superseded by a newer connection");
    }

    drop(sender);
    if let Err(e) = writer.await {
        tracing::warn!(%conn_id, error = %e, "writer task failed");
    }
    let _ = conn.close().await;
    tracing::info!(%conn_id, user_id = %user, "connection closed");

    result
}

/// Waits for `hello` and returns the user id it carries.
///
/// Anything else gets an error frame and ends the connection.
async fn perform_handshake<R: RoomRepository>(
    conn: &WebSocketConnection,
    state: &ServerState<R>,
) -> Result<UserId, GomokuError> {
    let data = match tokio::time::timeout(state.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before hello".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("hello timed out".into()).into());
        }
    };

    let user = match state.codec.decode::<ClientFrame>(&data) {
        Ok(ClientFrame::Hello { user_id }) if !user_id.as_str().trim().is_empty() => user_id,
        Ok(ClientFrame::Hello { .. }) => {
            send_error(conn, state, None, 400, "userId must not be empty").await?;
            return Err(ProtocolError::InvalidMessage("empty user id".into()).into());
        }
        Ok(_) => {
            send_error(conn, state, None, 400, "expected hello").await?;
            return Err(ProtocolError::InvalidMessage("first frame must be hello".into()).into());
        }
        Err(e) => {
            send_error(conn, state, None, 400, &e.to_string()).await?;
            return Err(e.into());
        }
    };
    Ok(user)
}

/// Sends an error frame straight to the socket, bypassing the queue.
async fn send_error<R>(
    conn: &WebSocketConnection,
    state: &ServerState<R>,
    id: Option<u64>,
    code: u16,
    message: &str,
) -> Result<(), GomokuError> {
    let bytes = state.codec.encode(&ServerFrame::Error {
        id,
        code,
        message: message.to_string(),
    })?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Reads frames until the peer goes away, errors, or idles out.
async fn read_loop<R: RoomRepository>(
    conn: &WebSocketConnection,
    state: &ServerState<R>,
    user: &UserId,
    outbox: &mpsc::Sender<Vec<u8>>,
) -> Result<(), GomokuError> {
    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(user_id = %user, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!(user_id = %user, error = %e, "recv error");
                return Ok(());
            }
            Err(_) => {
                tracing::info!(user_id = %user, "connection idle, closing");
                return Ok(());
            }
        };

        let response = match state.codec.decode::<ClientFrame>(&data) {
            Ok(ClientFrame::Request { id, call }) => {
                let method = call.method();
                match dispatch(state, user, call).await {
                    Ok(result) => {
                        tracing::debug!(user_id = %user, id, method, "request ok");
                        ServerFrame::Reply { id, result }
                    }
                    Err(e) => {
                        if matches!(e, RoomError::StorageFailure(_)) {
                            tracing::warn!(user_id = %user, id, method, error = %e, "request failed");
                        } else {
                            tracing::debug!(user_id = %user, id, method, error = %e, "request rejected");
                        }
                        ServerFrame::Error {
                            id: Some(id),
                            code: e.code(),
                            message: e.to_string(),
                        }
                    }
                }
            }
            Ok(ClientFrame::Ping) => ServerFrame::Pong,
            Ok(ClientFrame::Hello { .. }) => ServerFrame::Error {
                id: None,
                code: 400,
                message: "already said hello".into(),
            },
            Err(e) => {
                tracing::debug!(user_id = %user, error = %e, "undecodable frame");
                ServerFrame::Error {
                    id: None,
                    code: 400,
                    message: e.to_string(),
                }
            }
        };

        let bytes = state.codec.encode(&response)?;
        if outbox.send(bytes).await.is_err() {
            return Ok(());
        }
    }
}

/// Routes one request to the room service.
async fn dispatch<R: RoomRepository>(
    state: &ServerState<R>,
    user: &UserId,
    call: Request,
) -> Result<Reply, RoomError> {
    let service = &state.service;
    match call {
        Request::Create { nickname } => service.create(user, &nickname).await.map(Reply::Room),
        Request::Join { room_id, nickname } => {
            service.join(user, &nickname, &room_id).await.map(Reply::Room)
        }
        Request::Move { room_id, row, col } => {
            service.make_move(user, &room_id, row, col).await.map(Reply::Room)
        }
        Request::Leave { room_id } => service
            .leave(user, &room_id)
            .await
            .map(|outcome| Reply::Left(matches!(outcome, LeaveOutcome::Deleted(_)))),
        Request::GetRoom { room_id } => service.get_room(&room_id).await.map(Reply::Room),
        Request::ListRooms => service.list_rooms().await.map(Reply::Rooms),
        Request::Subscribe { room_id } => service
            .subscribe(user, &room_id)
            .await
            .map(|()| Reply::Subscribed),
    }
}

/// Drains the connection's queue to the socket until every sender is gone.
async fn write_loop(conn: Arc<WebSocketConnection>, mut queue: mpsc::Receiver<Vec<u8>>) {
    while let Some(frame) = queue.recv().await {
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }
}
