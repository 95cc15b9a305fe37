//! Integration tests for the gomoku server: handshake, request dispatch,
//! notifications and disconnect handling over real WebSockets.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gomoku::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = GomokuServerBuilder::new()
        .bind("127.0.0.1:0")
        .build(MemoryRoomStore::new())
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_frame(ws: &mut ClientWs, frame: &ClientFrame) {
    let text = serde_json::to_string(frame).expect("encode");
    ws.send(Message::Text(text.into())).await.expect("send");
}

async fn next_frame(ws: &mut ClientWs) -> ServerFrame {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .expect("recv");
    serde_json::from_slice(&msg.into_data()).expect("decode")
}

/// Connects and says hello as `user`.
async fn login(addr: &str, user: &str) -> ClientWs {
    let mut ws = connect(addr).await;
    send_frame(
        &mut ws,
        &ClientFrame::Hello {
            user_id: UserId::new(user),
        },
    )
    .await;
    match next_frame(&mut ws).await {
        ServerFrame::Welcome { user_id, .. } => assert_eq!(user_id, UserId::new(user)),
        other => panic!("expected Welcome, got {other:?}"),
    }
    ws
}

/// Sends a request and returns its reply or error, skipping notifications.
async fn call(ws: &mut ClientWs, id: u64, call: Request) -> ServerFrame {
    send_frame(ws, &ClientFrame::Request { id, call }).await;
    loop {
        match next_frame(ws).await {
            ServerFrame::Notify { .. } => continue,
            frame @ ServerFrame::Reply { id: got, .. } if got == id => return frame,
            frame @ ServerFrame::Error { id: Some(got), .. } if got == id => return frame,
            other => panic!("unexpected frame {other:?}"),
        }
    }
}

async fn call_room(ws: &mut ClientWs, id: u64, request: Request) -> Room {
    match call(ws, id, request).await {
        ServerFrame::Reply {
            result: Reply::Room(room),
            ..
        } => room,
        other => panic!("expected a room reply, got {other:?}"),
    }
}

/// Reads until a notification matching `pred` arrives.
async fn wait_for_notification(
    ws: &mut ClientWs,
    pred: impl Fn(&Notification) -> bool,
) -> Notification {
    loop {
        if let ServerFrame::Notify { message } = next_frame(ws).await {
            if pred(&message) {
                return message;
            }
        }
    }
}

fn error_code(frame: &ServerFrame) -> Option<u16> {
    match frame {
        ServerFrame::Error { code, .. } => Some(*code),
        _ => None,
    }
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_hello_gets_welcome() {
    let addr = start_server().await;
    login(&addr, "alice").await;
}

#[tokio::test]
async fn test_request_before_hello_is_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_frame(&mut ws, &ClientFrame::Ping).await;
    let frame = next_frame(&mut ws).await;
    assert_eq!(error_code(&frame), Some(400));
}

#[tokio::test]
async fn test_blank_user_id_is_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_frame(
        &mut ws,
        &ClientFrame::Hello {
            user_id: UserId::new("  "),
        },
    )
    .await;
    assert_eq!(error_code(&next_frame(&mut ws).await), Some(400));
}

// =========================================================================
// Requests
// =========================================================================

#[tokio::test]
async fn test_ping_pong() {
    let addr = start_server().await;
    let mut ws = login(&addr, "alice").await;

    send_frame(&mut ws, &ClientFrame::Ping).await;
    assert_eq!(next_frame(&mut ws).await, ServerFrame::Pong);
}

#[tokio::test]
async fn test_garbage_frame_keeps_connection_open() {
    let addr = start_server().await;
    let mut ws = login(&addr, "alice").await;

    ws.send(Message::Text("not json".to_string().into()))
        .await
        .unwrap();
    match next_frame(&mut ws).await {
        ServerFrame::Error { id, code, .. } => {
            assert_eq!(id, None);
            assert_eq!(code, 400);
        }
        other => panic!("expected Error, got {other:?}"),
    }

    send_frame(&mut ws, &ClientFrame::Ping).await;
    assert_eq!(next_frame(&mut ws).await, ServerFrame::Pong);
}

#[tokio::test]
async fn test_full_game_over_the_wire() {
    let addr = start_server().await;
    let mut alice = login(&addr, "alice").await;
    let mut bob = login(&addr, "bob").await;

    let room = call_room(
        &mut alice,
        1,
        Request::Create {
            nickname: "Alice".into(),
        },
    )
    .await;
    assert_eq!(room.status, RoomStatus::Waiting);

    let joined = call_room(
        &mut bob,
        1,
        Request::Join {
            room_id: room.id.clone(),
            nickname: "Bob".into(),
        },
    )
    .await;
    assert_eq!(joined.status, RoomStatus::Playing);

    let update = wait_for_notification(&mut alice, |n| matches!(n, Notification::RoomUpdate(_))).await;
    assert_eq!(update, Notification::RoomUpdate(joined));

    let mut last = None;
    for i in 0..5 {
        let id = 10 + i as u64;
        let r = call_room(
            &mut alice,
            id,
            Request::Move {
                room_id: room.id.clone(),
                row: 7,
                col: 3 + i,
            },
        )
        .await;
        if i < 4 {
            call_room(
                &mut bob,
                id,
                Request::Move {
                    room_id: room.id.clone(),
                    row: 0,
                    col: i,
                },
            )
            .await;
        }
        last = Some(r);
    }

    let last = last.unwrap();
    assert_eq!(last.status, RoomStatus::Finished);
    assert_eq!(last.winner.as_deref(), Some("Alice"));

    let final_update = wait_for_notification(&mut bob, |n| {
        matches!(n, Notification::GameUpdate(r) if r.status == RoomStatus::Finished)
    })
    .await;
    assert_eq!(final_update, Notification::GameUpdate(last));
}

#[tokio::test]
async fn test_room_errors_carry_codes() {
    let addr = start_server().await;
    let mut alice = login(&addr, "alice").await;
    let mut bob = login(&addr, "bob").await;

    let blank = call(
        &mut alice,
        1,
        Request::Create {
            nickname: " ".into(),
        },
    )
    .await;
    assert_eq!(error_code(&blank), Some(400));

    let missing = call(
        &mut alice,
        2,
        Request::GetRoom {
            room_id: RoomId::new("nope"),
        },
    )
    .await;
    assert_eq!(error_code(&missing), Some(404));

    let room = call_room(
        &mut alice,
        3,
        Request::Create {
            nickname: "Alice".into(),
        },
    )
    .await;
    let early = call(
        &mut alice,
        4,
        Request::Move {
            room_id: room.id.clone(),
            row: 7,
            col: 7,
        },
    )
    .await;
    assert_eq!(error_code(&early), Some(409));

    call_room(
        &mut bob,
        1,
        Request::Join {
            room_id: room.id.clone(),
            nickname: "Bob".into(),
        },
    )
    .await;
    let out_of_turn = call(
        &mut bob,
        2,
        Request::Move {
            room_id: room.id.clone(),
            row: 7,
            col: 7,
        },
    )
    .await;
    assert_eq!(error_code(&out_of_turn), Some(403));

    let off_board = call(
        &mut alice,
        5,
        Request::Move {
            room_id: room.id.clone(),
            row: 20,
            col: 7,
        },
    )
    .await;
    assert_eq!(error_code(&off_board), Some(422));
}

#[tokio::test]
async fn test_list_rooms_and_leave() {
    let addr = start_server().await;
    let mut alice = login(&addr, "alice").await;

    let room = call_room(
        &mut alice,
        1,
        Request::Create {
            nickname: "Alice".into(),
        },
    )
    .await;

    match call(&mut alice, 2, Request::ListRooms).await {
        ServerFrame::Reply {
            result: Reply::Rooms(rooms),
            ..
        } => assert!(rooms.iter().any(|r| r.id == room.id)),
        other => panic!("expected rooms, got {other:?}"),
    }

    let left = call(
        &mut alice,
        3,
        Request::Leave {
            room_id: room.id.clone(),
        },
    )
    .await;
    assert!(matches!(
        left,
        ServerFrame::Reply {
            result: Reply::Left(true),
            ..
        }
    ));

    let gone = call(&mut alice, 4, Request::GetRoom { room_id: room.id }).await;
    assert_eq!(error_code(&gone), Some(404));
}

// =========================================================================
// Disconnect
// =========================================================================

#[tokio::test]
async fn test_disconnect_leaves_room() {
    let addr = start_server().await;
    let mut alice = login(&addr, "alice").await;
    let mut bob = login(&addr, "bob").await;

    let room = call_room(
        &mut alice,
        1,
        Request::Create {
            nickname: "Alice".into(),
        },
    )
    .await;
    call_room(
        &mut bob,
        1,
        Request::Join {
            room_id: room.id.clone(),
            nickname: "Bob".into(),
        },
    )
    .await;

    bob.close(None).await.unwrap();

    let update = wait_for_notification(&mut alice, |n| {
        matches!(n, Notification::RoomUpdate(r) if r.status == RoomStatus::Waiting)
    })
    .await;
    let Notification::RoomUpdate(reset) = update else {
        unreachable!();
    };
    assert_eq!(reset.players.len(), 1);
    assert_eq!(reset.players[0].user_id, UserId::new("alice"));
    assert!(reset.board.is_empty());
}

#[tokio::test]
async fn test_resubscribe_after_reconnect() {
    let addr = start_server().await;
    let mut alice = login(&addr, "alice").await;
    let room = call_room(
        &mut alice,
        1,
        Request::Create {
            nickname: "Alice".into(),
        },
    )
    .await;

    // A second connection for the same user supersedes the first without
    // leaving the room.
    let mut again = login(&addr, "alice").await;
    drop(alice);

    let subscribed = call(
        &mut again,
        1,
        Request::Subscribe {
            room_id: room.id.clone(),
        },
    )
    .await;
    assert!(matches!(
        subscribed,
        ServerFrame::Reply {
            result: Reply::Subscribed,
            ..
        }
    ));

    let mut bob = login(&addr, "bob").await;
    call_room(
        &mut bob,
        1,
        Request::Join {
            room_id: room.id.clone(),
            nickname: "Bob".into(),
        },
    )
    .await;

    let update = wait_for_notification(&mut again, |n| matches!(n, Notification::RoomUpdate(_))).await;
    let Notification::RoomUpdate(room) = update else {
        unreachable!();
    };
    assert_eq!(room.status, RoomStatus::Playing);
}
