//! Error types for the storage layer.

use std::time::Duration;

use gomoku_protocol::{ProtocolError, RoomId, RoomStatus};

/// Errors a [`RoomRepository`](crate::RoomRepository) can report.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No document with this id exists in any partition searched.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// A create collided with an existing document in the same partition.
    #[error("room {0} already exists")]
    Conflict(RoomId),

    /// The document's own status disagrees with the partition it was
    /// written to.
    #[error("room {id} has status {found} but was written to partition {expected}")]
    PartitionMismatch {
        id: RoomId,
        expected: RoomStatus,
        found: RoomStatus,
    },

    /// A stored document could not be decoded.
    #[error("room {id} is corrupt: {source}")]
    Corrupt {
        id: RoomId,
        #[source]
        source: ProtocolError,
    },

    /// Encoding a room for storage failed.
    #[error(transparent)]
    Codec(#[from] ProtocolError),

    /// The operation did not complete within its bound.
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    /// The backing store is unreachable or refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
