//! Shared vocabulary of the gomoku backend.
//!
//! - **Documents** ([`Room`], [`Board`], [`Player`], ...) — the persisted
//!   room aggregate, partitioned in storage by [`RoomStatus`].
//! - **Messages** ([`Notification`], [`ClientFrame`], [`ServerFrame`]) —
//!   what travels over a room's channel and the request/response boundary.
//! - **Codec** ([`Codec`], [`JsonCodec`], [`peek_status`]) — bytes in,
//!   bytes out.
//!
//! ```text
//! Store (documents) ← Protocol → Hub / Transport (frames)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::{JsonCodec, peek_status};
pub use error::ProtocolError;
pub use message::{
    ClientFrame, DeleteReason, Notification, Reply, Request, RoomDeleted, ServerFrame,
};
pub use types::{
    BOARD_SIZE, Board, Color, Creator, DRAW_MARKER, EMPTY, Move, Player, Room, RoomId,
    RoomStatus, Spectator, UserId,
};
