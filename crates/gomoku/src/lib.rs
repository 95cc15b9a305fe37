//! # Gomoku
//!
//! Multiplayer five-in-a-row backend. Clients connect over WebSocket,
//! introduce themselves with a `hello` frame, then create, join and play
//! in rooms while receiving live room snapshots.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gomoku::prelude::*;
//!
//! # async fn run() -> Result<(), GomokuError> {
//! let server = GomokuServerBuilder::new()
//!     .bind("0.0.0.0:3000")
//!     .build(MemoryRoomStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::GomokuError;
pub use server::{GomokuServer, GomokuServerBuilder};

pub mod prelude {
    pub use crate::{GomokuError, GomokuServer, GomokuServerBuilder};
    pub use gomoku_hub::{Hub, NotificationGateway};
    pub use gomoku_protocol::{
        ClientFrame, Color, Notification, Reply, Request, Room, RoomId, RoomStatus, ServerFrame,
        UserId,
    };
    pub use gomoku_room::{LeaveOutcome, RoomError, RoomService, ServiceConfig};
    pub use gomoku_store::{MemoryRoomStore, RoomRepository, StorageError};
}
