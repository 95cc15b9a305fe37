//! The `NotificationGateway` trait.

use std::future::Future;
use std::sync::Arc;

use gomoku_protocol::{Notification, RoomId, UserId};

use crate::GatewayError;

/// Sends messages to a room's subscribers and manages who subscribes.
///
/// Implementations report failures; they never retry. The room service logs
/// and discards every error so a lost notification never fails an action.
pub trait NotificationGateway: Send + Sync + 'static {
    /// Sends `message` to every user currently in the room's group.
    fn broadcast(
        &self,
        room_id: &RoomId,
        message: &Notification,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Adds `user` to the room's group.
    fn subscribe(
        &self,
        user: &UserId,
        room_id: &RoomId,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Removes `user` from the room's group. Not an error if absent.
    fn unsubscribe(
        &self,
        user: &UserId,
        room_id: &RoomId,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

impl<N: NotificationGateway> NotificationGateway for Arc<N> {
    fn broadcast(
        &self,
        room_id: &RoomId,
        message: &Notification,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        (**self).broadcast(room_id, message)
    }

    fn subscribe(
        &self,
        user: &UserId,
        room_id: &RoomId,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        (**self).subscribe(user, room_id)
    }

    fn unsubscribe(
        &self,
        user: &UserId,
        room_id: &RoomId,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        (**self).unsubscribe(user, room_id)
    }
}
