//! The room document and everything it is built from.
//!
//! A [`Room`] is persisted as one self-describing JSON record. Field names
//! are camelCase on the wire so the stored shape matches what clients
//! receive in notifications.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies a user across rooms and connections.
///
/// Users are not authenticated by this system; the id is whatever the
/// client presented in its `hello` frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The true identity of a room. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocates a fresh random (UUID v4) room id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a room. Also the storage partition key.
///
/// ```text
/// Waiting ──second player joins──→ Playing ──win / full board──→ Finished
///    ↑                                │
///    └────── a player leaves ─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Every partition, in the order scans visit them.
    pub const ALL: [RoomStatus; 3] = [Self::Waiting, Self::Playing, Self::Finished];

    /// The partitions the lobby lists.
    pub const ACTIVE: [RoomStatus; 2] = [Self::Waiting, Self::Playing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::Finished => "finished",
        }
    }

    /// `Finished` has no outgoing transition other than deletion.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Color and Board
// ---------------------------------------------------------------------------

/// A stone color. Serialized as the bare cell value (`1` or `2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Color {
    /// Player one. Always moves first.
    Black = 1,
    White = 2,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }

    /// The value this color occupies on a [`Board`].
    pub fn cell(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Black => f.write_str("black"),
            Self::White => f.write_str("white"),
        }
    }
}

/// Side length of the square board.
pub const BOARD_SIZE: usize = 15;

/// Value of an unoccupied cell.
pub const EMPTY: u8 = 0;

/// A 15×15 grid of cells: `0` empty, `1` black, `2` white.
///
/// Serialized as nested arrays of integers, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board(pub [[u8; BOARD_SIZE]; BOARD_SIZE]);

impl Board {
    pub fn empty() -> Self {
        Self([[EMPTY; BOARD_SIZE]; BOARD_SIZE])
    }

    /// Returns the cell at `(row, col)`, or `None` off the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        self.0.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.stone_count() == 0
    }

    pub fn stone_count(&self) -> usize {
        self.0
            .iter()
            .flat_map(|row| row.iter())
            .filter(|cell| **cell != EMPTY)
            .count()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Room members and moves
// ---------------------------------------------------------------------------

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub user_id: UserId,
    pub nickname: String,
    pub color: Color,
    pub is_ready: bool,
}

/// A room member who watches but never places stones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spectator {
    pub user_id: UserId,
    pub nickname: String,
    pub join_time: DateTime<Utc>,
}

/// One placed stone, in the order it was played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub row: usize,
    pub col: usize,
    pub player: Color,
}

/// Who opened the room. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    pub user_id: UserId,
    pub nickname: String,
}

/// Value of [`Room::winner`] when the board filled up without five in a row.
pub const DRAW_MARKER: &str = "draw";

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One game session: members, board, turn and lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    /// 4-digit display code. Not unique.
    pub room_number: u16,
    pub creator: Creator,
    /// At most two. The first seat is always black.
    pub players: Vec<Player>,
    pub spectators: Vec<Spectator>,
    pub board: Board,
    /// Whose move is expected. Only meaningful while playing.
    pub current_player: Color,
    pub status: RoomStatus,
    pub move_history: Vec<Move>,
    /// A player's nickname, or [`DRAW_MARKER`]. Set only once finished.
    pub winner: Option<String>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    /// Drives inactivity reaping.
    pub last_action_time: DateTime<Utc>,
}

impl Room {
    /// Returns `true` if `user` is a player or a spectator here.
    pub fn is_member(&self, user: &UserId) -> bool {
        self.player_index(user).is_some() || self.spectator_index(user).is_some()
    }

    pub fn player_index(&self, user: &UserId) -> Option<usize> {
        self.players.iter().position(|p| &p.user_id == user)
    }

    pub fn spectator_index(&self, user: &UserId) -> Option<usize> {
        self.spectators.iter().position(|s| &s.user_id == user)
    }

    pub fn player_with_color(&self, color: Color) -> Option<&Player> {
        self.players.iter().find(|p| p.color == color)
    }

    /// The first color no seated player holds, if any.
    pub fn free_color(&self) -> Option<Color> {
        [Color::Black, Color::White]
            .into_iter()
            .find(|c| self.player_with_color(*c).is_none())
    }

    /// Records activity on the room.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.update_time = now;
        self.last_action_time = now;
    }
}
