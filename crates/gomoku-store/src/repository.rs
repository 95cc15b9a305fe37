//! The `RoomRepository` trait.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gomoku_protocol::{Room, RoomId, RoomStatus, UserId};

use crate::StorageError;

/// Access to room documents in a status-partitioned store.
///
/// The id is a room's identity; its status only says which partition holds
/// it. Lookups that don't know the status therefore scan every partition.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` and `Send` futures so a single repository can be
/// shared by every connection task and the reaper.
pub trait RoomRepository: Send + Sync + 'static {
    /// Finds a room by id, searching all partitions.
    ///
    /// # Errors
    /// [`StorageError::NotFound`] if no partition holds it.
    fn get(&self, id: &RoomId) -> impl Future<Output = Result<Room, StorageError>> + Send;

    /// Lists rooms in the given partitions.
    ///
    /// Within one partition rooms are newest first by `create_time`.
    /// Partitions are concatenated in the order given; callers must not rely
    /// on any ordering across them.
    fn list_by_statuses(
        &self,
        statuses: &[RoomStatus],
    ) -> impl Future<Output = Result<Vec<Room>, StorageError>> + Send;

    /// Returns the first room in which `user` is a player or a spectator.
    fn find_by_user(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<Room>, StorageError>> + Send;

    /// Persists `room`.
    ///
    /// - `previous == None` — pure create in `room.status`.
    /// - `previous == Some(room.status)` — replace in place.
    /// - otherwise — delete from `previous`, then create in `room.status`.
    ///   If the create fails the room is left absent and the error is
    ///   returned; nothing is rolled back.
    fn save(
        &self,
        room: &Room,
        previous: Option<RoomStatus>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Removes a room from the given partition. Absent rooms are not an error.
    fn delete(
        &self,
        id: &RoomId,
        status: RoomStatus,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Unscoped scan for rooms whose `last_action_time` is before `cutoff`.
    fn list_inactive(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Room>, StorageError>> + Send;
}

impl<R: RoomRepository> RoomRepository for Arc<R> {
    fn get(&self, id: &RoomId) -> impl Future<Output = Result<Room, StorageError>> + Send {
        (**self).get(id)
    }

    fn list_by_statuses(
        &self,
        statuses: &[RoomStatus],
    ) -> impl Future<Output = Result<Vec<Room>, StorageError>> + Send {
        (**self).list_by_statuses(statuses)
    }

    fn find_by_user(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<Room>, StorageError>> + Send {
        (**self).find_by_user(user)
    }

    fn save(
        &self,
        room: &Room,
        previous: Option<RoomStatus>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).save(room, previous)
    }

    fn delete(
        &self,
        id: &RoomId,
        status: RoomStatus,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).delete(id, status)
    }

    fn list_inactive(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Room>, StorageError>> + Send {
        (**self).list_inactive(cutoff)
    }
}
