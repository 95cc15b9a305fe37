//! Error types for the room layer.

use gomoku_protocol::{RoomId, UserId};
use gomoku_store::StorageError;

/// Errors a room operation can return.
///
/// Validation-type errors are raised before anything is persisted.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room's status does not allow this operation.
    #[error("invalid room state: {0}")]
    InvalidState(String),

    /// Someone other than the player to move tried to move.
    #[error("it is not {0}'s turn")]
    WrongTurn(UserId),

    /// Bad coordinates or an occupied cell.
    #[error("illegal move: {0}")]
    IllegalMove(String),

    /// The repository failed or timed out. A status-changing save may have
    /// already removed the old document.
    #[error("storage failure: {0}")]
    StorageFailure(#[source] StorageError),

    /// Malformed input at the request boundary.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl RoomError {
    /// Numeric code for the wire, following HTTP conventions.
    pub fn code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::WrongTurn(_) => 403,
            Self::NotFound(_) => 404,
            Self::InvalidState(_) => 409,
            Self::IllegalMove(_) => 422,
            Self::StorageFailure(_) => 503,
        }
    }
}

impl From<StorageError> for RoomError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => Self::NotFound(id),
            other => Self::StorageFailure(other),
        }
    }
}
