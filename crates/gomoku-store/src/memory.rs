//! In-process, status-partitioned document store.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use gomoku_protocol::{Codec, JsonCodec, Room, RoomId, RoomStatus, UserId, peek_status};
use tokio::sync::RwLock;

use crate::{RoomRepository, StorageError};

/// How a write treats an existing document with the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    /// Fail with `Conflict` if present.
    Create,
    /// Fail with `NotFound` if absent.
    Replace,
}

/// A [`RoomRepository`] that keeps encoded JSON documents in memory, one map
/// per status partition.
///
/// Documents are stored as bytes, not as `Room` values, so the store behaves
/// like a remote document database: every read decodes, every write encodes,
/// and a document's partition is checked against its own `status` field.
pub struct MemoryRoomStore {
    partitions: RwLock<HashMap<RoomStatus, BTreeMap<RoomId, Vec<u8>>>>,
    codec: JsonCodec,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        let partitions = RoomStatus::ALL
            .into_iter()
            .map(|status| (status, BTreeMap::new()))
            .collect();
        Self {
            partitions: RwLock::new(partitions),
            codec: JsonCodec,
        }
    }

    /// Stores an already-encoded document in `partition`, overwriting any
    /// document with the same id there.
    ///
    /// # Errors
    /// [`StorageError::PartitionMismatch`] if the document's status is not
    /// `partition`; a codec error if its status can't be read.
    pub async fn insert_raw(
        &self,
        partition: RoomStatus,
        id: RoomId,
        document: Vec<u8>,
    ) -> Result<(), StorageError> {
        check_partition(&id, partition, &document)?;
        self.partitions
            .write()
            .await
            .entry(partition)
            .or_default()
            .insert(id, document);
        Ok(())
    }

    /// Number of documents in one partition.
    pub async fn partition_len(&self, status: RoomStatus) -> usize {
        self.partitions
            .read()
            .await
            .get(&status)
            .map_or(0, BTreeMap::len)
    }

    /// Number of documents across all partitions.
    pub async fn len(&self) -> usize {
        self.partitions.read().await.values().map(BTreeMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn write(
        &self,
        partition: RoomStatus,
        id: &RoomId,
        document: Vec<u8>,
        mode: WriteMode,
    ) -> Result<(), StorageError> {
        check_partition(id, partition, &document)?;

        let mut partitions = self.partitions.write().await;
        let docs = partitions.entry(partition).or_default();
        match (mode, docs.contains_key(id)) {
            (WriteMode::Create, true) => return Err(StorageError::Conflict(id.clone())),
            (WriteMode::Replace, false) => return Err(StorageError::NotFound(id.clone())),
            _ => {}
        }
        docs.insert(id.clone(), document);
        Ok(())
    }

    /// Decodes every document in `status`, skipping any that fail.
    async fn scan(&self, status: RoomStatus) -> Vec<Room> {
        let partitions = self.partitions.read().await;
        let Some(docs) = partitions.get(&status) else {
            return Vec::new();
        };

        docs.iter()
            .filter_map(|(id, doc)| match self.codec.decode::<Room>(doc) {
                Ok(room) => Some(room),
                Err(e) => {
                    tracing::warn!(room_id = %id, %status, error = %e, "skipping undecodable room");
                    None
                }
            })
            .collect()
    }
}

impl Default for MemoryRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_partition(id: &RoomId, partition: RoomStatus, document: &[u8]) -> Result<(), StorageError> {
    let found = peek_status(document)?;
    if found != partition {
        return Err(StorageError::PartitionMismatch {
            id: id.clone(),
            expected: partition,
            found,
        });
    }
    Ok(())
}

impl RoomRepository for MemoryRoomStore {
    async fn get(&self, id: &RoomId) -> Result<Room, StorageError> {
        let partitions = self.partitions.read().await;
        for status in RoomStatus::ALL {
            let Some(doc) = partitions.get(&status).and_then(|docs| docs.get(id)) else {
                continue;
            };
            return self.codec.decode(doc).map_err(|source| StorageError::Corrupt {
                id: id.clone(),
                source,
            });
        }
        Err(StorageError::NotFound(id.clone()))
    }

    async fn list_by_statuses(&self, statuses: &[RoomStatus]) -> Result<Vec<Room>, StorageError> {
        let mut rooms = Vec::new();
        for status in statuses {
            let mut partition = self.scan(*status).await;
            partition.sort_by(|a, b| b.create_time.cmp(&a.create_time));
            rooms.extend(partition);
        }
        Ok(rooms)
    }

    async fn find_by_user(&self, user: &UserId) -> Result<Option<Room>, StorageError> {
        for status in RoomStatus::ALL {
            if let Some(room) = self
                .scan(status)
                .await
                .into_iter()
                .find(|room| room.is_member(user))
            {
                return Ok(Some(room));
            }
        }
        Ok(None)
    }

    async fn save(&self, room: &Room, previous: Option<RoomStatus>) -> Result<(), StorageError> {
        let document = self.codec.encode(room)?;

        match previous {
            None => {
                self.write(room.status, &room.id, document, WriteMode::Create)
                    .await
            }
            Some(previous) if previous == room.status => {
                self.write(room.status, &room.id, document, WriteMode::Replace)
                    .await
            }
            Some(previous) => {
                // Two independent steps. A failed create leaves the room absent.
                self.delete(&room.id, previous).await?;
                tracing::debug!(
                    room_id = %room.id,
                    from = %previous,
                    to = %room.status,
                    "moving room between partitions"
                );
                self.write(room.status, &room.id, document, WriteMode::Create)
                    .await
            }
        }
    }

    async fn delete(&self, id: &RoomId, status: RoomStatus) -> Result<(), StorageError> {
        let removed = self
            .partitions
            .write()
            .await
            .get_mut(&status)
            .and_then(|docs| docs.remove(id));
        if removed.is_none() {
            tracing::debug!(room_id = %id, %status, "delete of absent room ignored");
        }
        Ok(())
    }

    async fn list_inactive(&self, cutoff: DateTime<Utc>) -> Result<Vec<Room>, StorageError> {
        let mut rooms = Vec::new();
        for status in RoomStatus::ALL {
            rooms.extend(
                self.scan(status)
                    .await
                    .into_iter()
                    .filter(|room| room.last_action_time < cutoff),
            );
        }
        Ok(rooms)
    }
}
