//! Messages that leave the room core: channel notifications and the
//! request/response frames exchanged with clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Room, RoomId, UserId};

// ---------------------------------------------------------------------------
// Notification — what subscribers of a room's channel receive
// ---------------------------------------------------------------------------

/// A best-effort message fanned out to every subscriber of a room.
///
/// Adjacently tagged, so on the wire it reads
/// `{ "type": "game_update", "data": { ...room... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Notification {
    /// Full snapshot after a join or leave the room survived.
    RoomUpdate(Room),
    /// Full snapshot after a move.
    GameUpdate(Room),
    /// The room is about to be deleted.
    RoomDeleted(RoomDeleted),
}

impl Notification {
    /// The wire tag, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RoomUpdate(_) => "room_update",
            Self::GameUpdate(_) => "game_update",
            Self::RoomDeleted(_) => "room_deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDeleted {
    pub room_id: RoomId,
    pub reason: DeleteReason,
}

/// Why a room went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    /// The last player left.
    Abandoned,
    /// Retired by the reaper.
    Inactivity,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// A frame sent by a client. The first one on a connection must be `Hello`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    Hello { user_id: UserId },
    /// `{ "type": "request", "id": 1, "method": "...", "params": { ... } }`
    Request {
        id: u64,
        #[serde(flatten)]
        call: Request,
    },
    Ping,
}

/// A Room Service operation and its arguments.
///
/// `{ "method": "move", "params": { "roomId": "...", "row": 7, "col": 7 } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "params",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    Create { nickname: String },
    Join { room_id: RoomId, nickname: String },
    Move { room_id: RoomId, row: usize, col: usize },
    Leave { room_id: RoomId },
    GetRoom { room_id: RoomId },
    ListRooms,
    /// Re-join a room's channel, e.g. after reconnecting.
    Subscribe { room_id: RoomId },
}

impl Request {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Join { .. } => "join",
            Self::Move { .. } => "move",
            Self::Leave { .. } => "leave",
            Self::GetRoom { .. } => "get_room",
            Self::ListRooms => "list_rooms",
            Self::Subscribe { .. } => "subscribe",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Successful result of a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Reply {
    Room(Room),
    Rooms(Vec<Room>),
    /// `true` if leaving destroyed the room.
    Left(bool),
    Subscribed,
}

/// A frame sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    Welcome {
        user_id: UserId,
        server_time: DateTime<Utc>,
    },
    Reply {
        id: u64,
        result: Reply,
    },
    /// `id` is absent when the offending frame could not be decoded.
    /// `code` follows HTTP conventions.
    Error {
        id: Option<u64>,
        code: u16,
        message: String,
    },
    Notify {
        message: Notification,
    },
    Pong,
}
