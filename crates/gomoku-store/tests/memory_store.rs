//! Integration tests for the partitioned in-memory room store.

use chrono::{Duration, Utc};
use gomoku_protocol::{
    Board, Color, Creator, Player, Room, RoomId, RoomStatus, Spectator, UserId,
};
use gomoku_store::{MemoryRoomStore, RoomRepository, StorageError};

// =========================================================================
// Helpers
// =========================================================================

fn uid(id: &str) -> UserId {
    UserId::new(id)
}

fn player(id: &str, color: Color) -> Player {
    Player {
        user_id: uid(id),
        nickname: id.to_uppercase(),
        color,
        is_ready: true,
    }
}

/// A waiting room owned by `owner`, created `age_minutes` ago.
fn room(id: &str, owner: &str, age_minutes: i64) -> Room {
    let at = Utc::now() - Duration::minutes(age_minutes);
    Room {
        id: RoomId::new(id),
        room_number: 1234,
        creator: Creator {
            user_id: uid(owner),
            nickname: owner.to_uppercase(),
        },
        players: vec![player(owner, Color::Black)],
        spectators: vec![],
        board: Board::empty(),
        current_player: Color::Black,
        status: RoomStatus::Waiting,
        move_history: vec![],
        winner: None,
        create_time: at,
        update_time: at,
        last_action_time: at,
    }
}

// =========================================================================
// save / get
// =========================================================================

#[tokio::test]
async fn test_create_then_get() {
    let store = MemoryRoomStore::new();
    let r = room("r1", "alice", 0);
    store.save(&r, None).await.unwrap();

    let loaded = store.get(&r.id).await.unwrap();
    assert_eq!(loaded, r);
    assert_eq!(store.partition_len(RoomStatus::Waiting).await, 1);
}

#[tokio::test]
async fn test_create_twice_conflicts() {
    let store = MemoryRoomStore::new();
    let r = room("r1", "alice", 0);
    store.save(&r, None).await.unwrap();

    let err = store.save(&r, None).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(id) if id == r.id));
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let store = MemoryRoomStore::new();
    let err = store.get(&RoomId::new("nope")).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn test_replace_in_same_partition() {
    let store = MemoryRoomStore::new();
    let mut r = room("r1", "alice", 0);
    store.save(&r, None).await.unwrap();

    r.spectators.push(Spectator {
        user_id: uid("carol"),
        nickname: "CAROL".into(),
        join_time: Utc::now(),
    });
    store.save(&r, Some(RoomStatus::Waiting)).await.unwrap();

    let loaded = store.get(&r.id).await.unwrap();
    assert_eq!(loaded.spectators.len(), 1);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_replace_of_absent_room_is_not_found() {
    let store = MemoryRoomStore::new();
    let r = room("r1", "alice", 0);
    let err = store.save(&r, Some(RoomStatus::Waiting)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn test_status_change_moves_partition() {
    let store = MemoryRoomStore::new();
    let mut r = room("r1", "alice", 0);
    store.save(&r, None).await.unwrap();

    r.players.push(player("bob", Color::White));
    r.status = RoomStatus::Playing;
    store.save(&r, Some(RoomStatus::Waiting)).await.unwrap();

    assert_eq!(store.partition_len(RoomStatus::Waiting).await, 0);
    assert_eq!(store.partition_len(RoomStatus::Playing).await, 1);
    assert_eq!(store.get(&r.id).await.unwrap().status, RoomStatus::Playing);
}

// =========================================================================
// delete
// =========================================================================

#[tokio::test]
async fn test_delete_is_idempotent() {
    let store = MemoryRoomStore::new();
    let r = room("r1", "alice", 0);
    store.save(&r, None).await.unwrap();

    store.delete(&r.id, RoomStatus::Waiting).await.unwrap();
    store.delete(&r.id, RoomStatus::Waiting).await.unwrap();
    assert!(store.is_empty().await);
    assert!(matches!(
        store.get(&r.id).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_in_wrong_partition_leaves_room() {
    let store = MemoryRoomStore::new();
    let r = room("r1", "alice", 0);
    store.save(&r, None).await.unwrap();

    store.delete(&r.id, RoomStatus::Finished).await.unwrap();
    assert!(store.get(&r.id).await.is_ok());
}

// =========================================================================
// Scans
// =========================================================================

#[tokio::test]
async fn test_list_by_statuses_newest_first_per_partition() {
    let store = MemoryRoomStore::new();
    store.save(&room("old", "a", 30), None).await.unwrap();
    store.save(&room("new", "b", 1), None).await.unwrap();
    store.save(&room("mid", "c", 10), None).await.unwrap();

    let mut playing = room("p", "d", 5);
    playing.status = RoomStatus::Playing;
    store.save(&playing, None).await.unwrap();

    let mut finished = room("f", "e", 5);
    finished.status = RoomStatus::Finished;
    store.save(&finished, None).await.unwrap();

    let waiting = store.list_by_statuses(&[RoomStatus::Waiting]).await.unwrap();
    let ids: Vec<_> = waiting.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["new", "mid", "old"]);

    let active = store.list_by_statuses(&RoomStatus::ACTIVE).await.unwrap();
    assert_eq!(active.len(), 4);
    assert!(active.iter().all(|r| r.status != RoomStatus::Finished));
}

#[tokio::test]
async fn test_find_by_user_matches_players_and_spectators() {
    let store = MemoryRoomStore::new();
    let mut r = room("r1", "alice", 0);
    r.spectators.push(Spectator {
        user_id: uid("carol"),
        nickname: "CAROL".into(),
        join_time: Utc::now(),
    });
    store.save(&r, None).await.unwrap();

    let by_player = store.find_by_user(&uid("alice")).await.unwrap();
    assert_eq!(by_player.map(|r| r.id), Some(RoomId::new("r1")));

    let by_spectator = store.find_by_user(&uid("carol")).await.unwrap();
    assert_eq!(by_spectator.map(|r| r.id), Some(RoomId::new("r1")));

    assert!(store.find_by_user(&uid("dave")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_by_user_searches_finished_partition() {
    let store = MemoryRoomStore::new();
    let mut r = room("r1", "alice", 0);
    r.status = RoomStatus::Finished;
    r.winner = Some("ALICE".into());
    store.save(&r, None).await.unwrap();

    let found = store.find_by_user(&uid("alice")).await.unwrap();
    assert_eq!(found.map(|r| r.status), Some(RoomStatus::Finished));
}

#[tokio::test]
async fn test_list_inactive_scans_every_partition() {
    let store = MemoryRoomStore::new();
    store.save(&room("stale-waiting", "a", 11), None).await.unwrap();
    store.save(&room("fresh", "b", 5), None).await.unwrap();

    let mut stale_finished = room("stale-finished", "c", 30);
    stale_finished.status = RoomStatus::Finished;
    store.save(&stale_finished, None).await.unwrap();

    let cutoff = Utc::now() - Duration::minutes(10);
    let mut ids: Vec<_> = store
        .list_inactive(cutoff)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id.0)
        .collect();
    ids.sort();
    assert_eq!(ids, ["stale-finished", "stale-waiting"]);
}

// =========================================================================
// Raw documents
// =========================================================================

#[tokio::test]
async fn test_insert_raw_rejects_partition_mismatch() {
    let store = MemoryRoomStore::new();
    let doc = br#"{"id":"r1","status":"playing"}"#.to_vec();

    let err = store
        .insert_raw(RoomStatus::Waiting, RoomId::new("r1"), doc)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::PartitionMismatch {
            expected: RoomStatus::Waiting,
            found: RoomStatus::Playing,
            ..
        }
    ));
}

#[tokio::test]
async fn test_corrupt_document_is_reported_on_get_and_skipped_on_scan() {
    let store = MemoryRoomStore::new();
    store.save(&room("good", "alice", 0), None).await.unwrap();
    store
        .insert_raw(
            RoomStatus::Waiting,
            RoomId::new("bad"),
            br#"{"id":"bad","status":"waiting"}"#.to_vec(),
        )
        .await
        .unwrap();

    let err = store.get(&RoomId::new("bad")).await.unwrap_err();
    assert!(matches!(err, StorageError::Corrupt { .. }));

    let listed = store.list_by_statuses(&[RoomStatus::Waiting]).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, RoomId::new("good"));
}
