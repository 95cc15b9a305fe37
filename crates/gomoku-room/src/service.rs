//! The room service: create, join, move and leave.
//!
//! Every mutation is load, validate, persist, notify. There is no lock
//! between the load and the save, so two concurrent writers to the same
//! room can lose an update. Turn order keeps legitimate concurrent moves
//! rare.

use std::future::Future;

use chrono::{DateTime, Utc};
use gomoku_hub::{GatewayError, NotificationGateway};
use gomoku_protocol::{
    Board, Color, Creator, DRAW_MARKER, DeleteReason, Move, Notification, Player, Room,
    RoomDeleted, RoomId, RoomStatus, Spectator, UserId,
};
use gomoku_store::{RoomRepository, StorageError};
use rand::Rng;

use crate::board::{apply_move, check_draw, check_win};
use crate::{RoomError, ServiceConfig};

/// Longest accepted nickname, in characters.
pub const MAX_NICKNAME_LEN: usize = 32;

/// What a `leave` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The user was in no room (or not in the one named). Nothing changed.
    NotMember,
    /// The user left; the room lives on in the returned state.
    Left(Room),
    /// The user was the last player and the room was destroyed.
    Deleted(RoomId),
}

/// Orchestrates the board rules, the repository and the notification
/// gateway.
///
/// Shared across connection tasks behind an `Arc`; holds no mutable state.
pub struct RoomService<R, N> {
    repo: R,
    gateway: N,
    config: ServiceConfig,
}

impl<R: RoomRepository, N: NotificationGateway> RoomService<R, N> {
    pub fn new(repo: R, gateway: N, config: ServiceConfig) -> Self {
        Self {
            repo,
            gateway,
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Opens a new waiting room with `user` seated as black.
    ///
    /// Any room the user was already in is left first.
    pub async fn create(&self, user: &UserId, nickname: &str) -> Result<Room, RoomError> {
        let nickname = validate_nickname(nickname)?;
        self.leave_current(user).await?;

        let now = Utc::now();
        let room_number = rand::rng().random_range(1000u16..10000);
        let room = Room {
            id: RoomId::generate(),
            room_number,
            creator: Creator {
                user_id: user.clone(),
                nickname: nickname.clone(),
            },
            players: vec![Player {
                user_id: user.clone(),
                nickname,
                color: Color::Black,
                is_ready: true,
            }],
            spectators: Vec::new(),
            board: Board::empty(),
            current_player: Color::Black,
            status: RoomStatus::Waiting,
            move_history: Vec::new(),
            winner: None,
            create_time: now,
            update_time: now,
            last_action_time: now,
        };

        self.storage(self.repo.save(&room, None)).await?;
        self.subscribe_quietly(user, &room.id).await;

        tracing::info!(room_id = %room.id, room_number, user_id = %user, "room created");
        Ok(room)
    }

    /// Seats `user` in a room, as white if a seat is free and otherwise as
    /// a spectator. Joining a room you are already in changes nothing.
    ///
    /// Any other room the user is in is left before the target is loaded,
    /// so a join to a missing room still leaves the old one.
    pub async fn join(&self, user: &UserId, nickname: &str, room_id: &RoomId) -> Result<Room, RoomError> {
        let nickname = validate_nickname(nickname)?;

        if let Some(current) = self.storage(self.repo.find_by_user(user)).await? {
            if &current.id == room_id {
                tracing::debug!(%room_id, user_id = %user, "already a member");
                self.subscribe_quietly(user, room_id).await;
                return Ok(current);
            }
            tracing::debug!(from = %current.id, to = %room_id, user_id = %user, "switching rooms");
            self.leave_room(user, current).await?;
        }

        let mut room = self.storage(self.repo.get(room_id)).await?;

        let previous = room.status;
        let now = Utc::now();
        let seat = if previous.is_terminal() || room.players.len() >= 2 {
            None
        } else {
            room.free_color()
        };

        match seat {
            Some(color) => {
                room.players.push(Player {
                    user_id: user.clone(),
                    nickname,
                    color,
                    is_ready: true,
                });
                if room.players.len() == 2 {
                    room.status = RoomStatus::Playing;
                    room.current_player = Color::Black;
                }
                tracing::info!(%room_id, user_id = %user, %color, status = %room.status, "player joined");
            }
            None => {
                room.spectators.push(Spectator {
                    user_id: user.clone(),
                    nickname,
                    join_time: now,
                });
                tracing::info!(%room_id, user_id = %user, "spectator joined");
            }
        }
        room.touch(now);

        self.storage(self.repo.save(&room, Some(previous))).await?;
        self.subscribe_quietly(user, room_id).await;
        self.notify(room_id, Notification::RoomUpdate(room.clone())).await;
        Ok(room)
    }

    /// Places the mover's stone at `(row, col)`.
    pub async fn make_move(
        &self,
        user: &UserId,
        room_id: &RoomId,
        row: usize,
        col: usize,
    ) -> Result<Room, RoomError> {
        let mut room = self.storage(self.repo.get(room_id)).await?;

        if room.status != RoomStatus::Playing {
            return Err(RoomError::InvalidState(format!(
                "room {room_id} is {}, not playing",
                room.status
            )));
        }

        let mover = match room.player_with_color(room.current_player) {
            Some(player) if &player.user_id == user => player.clone(),
            _ => return Err(RoomError::WrongTurn(user.clone())),
        };

        room.board = apply_move(&room.board, row, col, mover.color)?;
        room.move_history.push(Move {
            row,
            col,
            player: mover.color,
        });

        if check_win(&room.board, row, col) {
            room.status = RoomStatus::Finished;
            room.winner = Some(mover.nickname.clone());
            tracing::info!(%room_id, winner = %mover.user_id, moves = room.move_history.len(), "game won");
        } else if check_draw(&room.board) {
            room.status = RoomStatus::Finished;
            room.winner = Some(DRAW_MARKER.to_owned());
            tracing::info!(%room_id, "game drawn");
        } else {
            room.current_player = mover.color.opponent();
        }
        room.touch(Utc::now());

        self.storage(self.repo.save(&room, Some(RoomStatus::Playing))).await?;
        tracing::debug!(%room_id, user_id = %user, row, col, "move applied");
        self.notify(room_id, Notification::GameUpdate(room.clone())).await;
        Ok(room)
    }

    /// Removes `user` from a room.
    ///
    /// A stale or unknown `room_id` falls back to the user's actual room;
    /// if they are in none this is a no-op.
    pub async fn leave(&self, user: &UserId, room_id: &RoomId) -> Result<LeaveOutcome, RoomError> {
        let room = match self.storage(self.repo.get(room_id)).await {
            Ok(room) => Some(room),
            Err(StorageError::NotFound(_)) => self.storage(self.repo.find_by_user(user)).await?,
            Err(e) => return Err(e.into()),
        };

        match room {
            Some(room) => self.leave_room(user, room).await,
            None => Ok(LeaveOutcome::NotMember),
        }
    }

    /// Leaves whatever room `user` is in. Used on disconnect and before
    /// `create`.
    pub async fn leave_current(&self, user: &UserId) -> Result<LeaveOutcome, RoomError> {
        match self.storage(self.repo.find_by_user(user)).await? {
            Some(room) => self.leave_room(user, room).await,
            None => Ok(LeaveOutcome::NotMember),
        }
    }

    async fn leave_room(&self, user: &UserId, mut room: Room) -> Result<LeaveOutcome, RoomError> {
        if let Some(index) = room.player_index(user) {
            room.players.remove(index);
        } else if let Some(index) = room.spectator_index(user) {
            room.spectators.remove(index);
        } else {
            return Ok(LeaveOutcome::NotMember);
        }

        // The leaver stays subscribed until the store reflects the departure.
        if room.players.is_empty() {
            self.destroy(&room, DeleteReason::Abandoned).await?;
            self.unsubscribe_quietly(user, &room.id).await;
            return Ok(LeaveOutcome::Deleted(room.id));
        }

        let previous = room.status;
        if previous == RoomStatus::Playing && room.players.len() < 2 {
            soft_reset(&mut room);
            tracing::info!(room_id = %room.id, "player left mid-game, room reset to waiting");
        }
        room.touch(Utc::now());

        self.storage(self.repo.save(&room, Some(previous))).await?;
        self.unsubscribe_quietly(user, &room.id).await;
        tracing::info!(room_id = %room.id, user_id = %user, "left room");
        self.notify(&room.id, Notification::RoomUpdate(room.clone())).await;
        Ok(LeaveOutcome::Left(room))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn get_room(&self, room_id: &RoomId) -> Result<Room, RoomError> {
        Ok(self.storage(self.repo.get(room_id)).await?)
    }

    /// Waiting and playing rooms, newest first within each status.
    pub async fn list_rooms(&self) -> Result<Vec<Room>, RoomError> {
        Ok(self
            .storage(self.repo.list_by_statuses(&RoomStatus::ACTIVE))
            .await?)
    }

    /// Re-joins a member to the room's channel, e.g. after a reconnect.
    pub async fn subscribe(&self, user: &UserId, room_id: &RoomId) -> Result<(), RoomError> {
        let room = self.storage(self.repo.get(room_id)).await?;
        if !room.is_member(user) {
            return Err(RoomError::InvalidState(format!(
                "{user} is not a member of room {room_id}"
            )));
        }
        self.subscribe_quietly(user, room_id).await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reaper support
    // -----------------------------------------------------------------------

    pub(crate) async fn inactive_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Room>, RoomError> {
        Ok(self.storage(self.repo.list_inactive(cutoff)).await?)
    }

    /// Reloads a sweep candidate. Returns `None` if it is gone, changed
    /// status, or saw activity at or after `cutoff` since it was listed.
    pub(crate) async fn still_idle(
        &self,
        listed: &Room,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Room>, RoomError> {
        let current = match self.storage(self.repo.get(&listed.id)).await {
            Ok(room) => room,
            Err(StorageError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if current.status != listed.status || current.last_action_time >= cutoff {
            return Ok(None);
        }
        Ok(Some(current))
    }

    /// Announces the deletion, empties the channel and removes the document.
    pub(crate) async fn destroy(&self, room: &Room, reason: DeleteReason) -> Result<(), RoomError> {
        self.notify(
            &room.id,
            Notification::RoomDeleted(RoomDeleted {
                room_id: room.id.clone(),
                reason,
            }),
        )
        .await;

        for user in room
            .players
            .iter()
            .map(|p| &p.user_id)
            .chain(room.spectators.iter().map(|s| &s.user_id))
        {
            self.unsubscribe_quietly(user, &room.id).await;
        }

        self.storage(self.repo.delete(&room.id, room.status)).await?;
        tracing::info!(room_id = %room.id, ?reason, "room deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bounded I/O
    // -----------------------------------------------------------------------

    async fn storage<T>(
        &self,
        op: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        let limit = self.config.storage_timeout;
        tokio::time::timeout(limit, op)
            .await
            .unwrap_or(Err(StorageError::Timeout(limit)))
    }

    async fn notify(&self, room_id: &RoomId, message: Notification) {
        let kind = message.kind();
        self.best_effort(kind, room_id, self.gateway.broadcast(room_id, &message))
            .await;
    }

    async fn subscribe_quietly(&self, user: &UserId, room_id: &RoomId) {
        self.best_effort("subscribe", room_id, self.gateway.subscribe(user, room_id))
            .await;
    }

    async fn unsubscribe_quietly(&self, user: &UserId, room_id: &RoomId) {
        self.best_effort("unsubscribe", room_id, self.gateway.unsubscribe(user, room_id))
            .await;
    }

    /// Runs a gateway call under the notify timeout and logs any failure.
    async fn best_effort(
        &self,
        what: &'static str,
        room_id: &RoomId,
        op: impl Future<Output = Result<(), GatewayError>>,
    ) {
        let limit = self.config.notify_timeout;
        let result = tokio::time::timeout(limit, op)
            .await
            .unwrap_or(Err(GatewayError::Timeout(limit)));
        if let Err(e) = result {
            tracing::warn!(%room_id, op = what, error = %e, "notification gateway call failed");
        }
    }
}

/// Trims and checks a display name.
///
/// # Errors
/// [`RoomError::Validation`] if it is blank or longer than
/// [`MAX_NICKNAME_LEN`] characters.
pub fn validate_nickname(nickname: &str) -> Result<String, RoomError> {
    let trimmed = nickname.trim();
    if trimmed.is_empty() {
        return Err(RoomError::Validation("nickname must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_NICKNAME_LEN {
        return Err(RoomError::Validation(format!(
            "nickname must be at most {MAX_NICKNAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

/// Back to an empty waiting room with the remaining player as black.
fn soft_reset(room: &mut Room) {
    room.status = RoomStatus::Waiting;
    room.board = Board::empty();
    room.move_history.clear();
    room.current_player = Color::Black;
    room.winner = None;
    for player in &mut room.players {
        player.color = Color::Black;
        player.is_ready = true;
    }
}
