//! Room storage for the gomoku backend.
//!
//! Rooms live in a document store partitioned by [`RoomStatus`]. Because the
//! partition key is also a mutable field, a status change moves the document:
//! it is deleted from the old partition and created in the new one. The two
//! steps are not atomic.
//!
//! # Key types
//!
//! - [`RoomRepository`] — the contract the room service consumes
//! - [`MemoryRoomStore`] — in-process implementation holding encoded documents
//! - [`StorageError`] — everything that can go wrong
//!
//! [`RoomStatus`]: gomoku_protocol::RoomStatus

mod error;
mod memory;
mod repository;

pub use error::StorageError;
pub use memory::MemoryRoomStore;
pub use repository::RoomRepository;
