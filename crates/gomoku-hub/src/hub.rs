//! In-process pub/sub hub.
//!
//! Each live connection owns a bounded queue of encoded frames. Groups map a
//! room to the users subscribed to it; membership is by user, so it
//! survives a reconnect.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use gomoku_protocol::{Codec, JsonCodec, Notification, RoomId, ServerFrame, UserId};
use gomoku_transport::ConnectionId;
use tokio::sync::{RwLock, mpsc};

use crate::{GatewayError, NotificationGateway};

/// Default per-connection queue length.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// A connection's handle on its outbound queue.
///
/// `sender` is for the connection's own replies; `receiver` is drained by
/// its writer task. Notifications arrive on the same queue, so replies and
/// notifications reach the client in enqueue order.
pub struct Registration {
    pub id: ConnectionId,
    pub sender: mpsc::Sender<Vec<u8>>,
    pub receiver: mpsc::Receiver<Vec<u8>>,
}

struct Outbox {
    id: ConnectionId,
    sender: mpsc::Sender<Vec<u8>>,
}

#[derive(Default)]
struct HubState {
    connections: HashMap<UserId, Outbox>,
    groups: HashMap<RoomId, BTreeSet<UserId>>,
}

/// Cheap-to-clone hub shared by the server and the room service.
#[derive(Clone)]
pub struct Hub {
    state: Arc<RwLock<HubState>>,
    codec: JsonCodec,
    queue_capacity: usize,
}

impl Hub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(HubState::default())),
            codec: JsonCodec,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Opens a queue for `user`. Replaces any earlier connection of theirs;
    /// the old queue closes once its sender is dropped.
    pub async fn register(&self, user: UserId, id: ConnectionId) -> Registration {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let previous = self.state.write().await.connections.insert(
            user.clone(),
            Outbox {
                id,
                sender: sender.clone(),
            },
        );
        if let Some(old) = previous {
            tracing::info!(user_id = %user, old = %old.id, new = %id, "connection replaced");
        }
        Registration {
            id,
            sender,
            receiver,
        }
    }

    /// Drops `user`'s queue if it still belongs to connection `id`.
    ///
    /// Returns `false` when a newer connection has taken over.
    pub async fn unregister(&self, user: &UserId, id: ConnectionId) -> bool {
        let mut state = self.state.write().await;
        match state.connections.get(user) {
            Some(outbox) if outbox.id == id => {
                state.connections.remove(user);
                true
            }
            _ => false,
        }
    }

    pub async fn is_connected(&self, user: &UserId) -> bool {
        self.state.read().await.connections.contains_key(user)
    }

    /// Users subscribed to a room, in id order.
    pub async fn members(&self, room_id: &RoomId) -> Vec<UserId> {
        self.state
            .read()
            .await
            .groups
            .get(room_id)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn group_count(&self) -> usize {
        self.state.read().await.groups.len()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl NotificationGateway for Hub {
    async fn broadcast(&self, room_id: &RoomId, message: &Notification) -> Result<(), GatewayError> {
        let frame = self.codec.encode(&ServerFrame::Notify {
            message: message.clone(),
        })?;

        let state = self.state.read().await;
        let Some(members) = state.groups.get(room_id) else {
            tracing::debug!(%room_id, kind = message.kind(), "no subscribers");
            return Ok(());
        };

        let mut delivered = 0usize;
        for user in members {
            let Some(outbox) = state.connections.get(user) else {
                continue;
            };
            match outbox.sender.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(%room_id, user_id = %user, "outbound queue full, dropping notification");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(%room_id, user_id = %user, "outbound queue closed");
                }
            }
        }

        tracing::debug!(%room_id, kind = message.kind(), delivered, "notification sent");
        Ok(())
    }

    async fn subscribe(&self, user: &UserId, room_id: &RoomId) -> Result<(), GatewayError> {
        self.state
            .write()
            .await
            .groups
            .entry(room_id.clone())
            .or_default()
            .insert(user.clone());
        Ok(())
    }

    async fn unsubscribe(&self, user: &UserId, room_id: &RoomId) -> Result<(), GatewayError> {
        let mut state = self.state.write().await;
        if let Some(users) = state.groups.get_mut(room_id) {
            users.remove(user);
            if users.is_empty() {
                state.groups.remove(room_id);
            }
        }
        Ok(())
    }
}
