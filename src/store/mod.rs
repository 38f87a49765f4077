// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Board object storage and per-board advisory locking.
//!
//! The pipeline talks to storage through the [`BoardStore`] trait so tests can
//! run against [`MemoryBoardStore`] while deployments use [`BoardFolder`].
//! Timestamps are server-assigned: every insert/update stamps `updated_at_ms`
//! inside the store, never in the caller.

pub mod board_folder;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::model::{BoardId, BoardObject, ObjectId};

pub use board_folder::{BoardFolder, WriteDurability};

pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    ObjectNotFound { board_id: BoardId, object_id: ObjectId },
    Backend { message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
            Self::ObjectNotFound { board_id, object_id } => {
                write!(f, "object {object_id} not found on board {board_id}")
            }
            Self::Backend { message } => write!(f, "storage backend error: {message}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::ObjectNotFound { .. } | Self::Backend { .. } => None,
        }
    }
}

/// Persistent per-board object store.
///
/// `delete_objects` commits one atomic chunk per call and skips ids that are
/// already absent; `update_objects` is strict and fails on unknown ids.
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// Lists ids of boards the store currently knows about.
    async fn list_boards(&self) -> Result<Vec<BoardId>, StoreError>;

    async fn list_objects(&self, board_id: &BoardId) -> Result<Vec<BoardObject>, StoreError>;

    async fn insert_objects(
        &self,
        board_id: &BoardId,
        objects: Vec<BoardObject>,
    ) -> Result<(), StoreError>;

    async fn update_objects(
        &self,
        board_id: &BoardId,
        objects: Vec<BoardObject>,
    ) -> Result<(), StoreError>;

    /// Deletes the listed ids in one atomic commit; returns how many existed.
    async fn delete_objects(
        &self,
        board_id: &BoardId,
        object_ids: &[ObjectId],
    ) -> Result<u64, StoreError>;
}

/// In-memory store for tests and demo mode.
#[derive(Debug, Default)]
pub struct MemoryBoardStore {
    boards: tokio::sync::Mutex<BTreeMap<BoardId, BTreeMap<ObjectId, BoardObject>>>,
}

impl MemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BoardStore for MemoryBoardStore {
    async fn list_boards(&self) -> Result<Vec<BoardId>, StoreError> {
        let boards = self.boards.lock().await;
        Ok(boards.iter().filter(|(_, objects)| !objects.is_empty()).map(|(id, _)| id.clone()).collect())
    }

    async fn list_objects(&self, board_id: &BoardId) -> Result<Vec<BoardObject>, StoreError> {
        let boards = self.boards.lock().await;
        Ok(boards.get(board_id).map(|objects| objects.values().cloned().collect()).unwrap_or_default())
    }

    async fn insert_objects(
        &self,
        board_id: &BoardId,
        objects: Vec<BoardObject>,
    ) -> Result<(), StoreError> {
        let stamp = now_ms();
        let mut boards = self.boards.lock().await;
        let board = boards.entry(board_id.clone()).or_default();
        for mut object in objects {
            object.set_updated_at_ms(stamp);
            board.insert(object.id().clone(), object);
        }
        Ok(())
    }

    async fn update_objects(
        &self,
        board_id: &BoardId,
        objects: Vec<BoardObject>,
    ) -> Result<(), StoreError> {
        let stamp = now_ms();
        let mut boards = self.boards.lock().await;
        let board = boards.entry(board_id.clone()).or_default();
        for object in &objects {
            if !board.contains_key(object.id()) {
                return Err(StoreError::ObjectNotFound {
                    board_id: board_id.clone(),
                    object_id: object.id().clone(),
                });
            }
        }
        for mut object in objects {
            object.set_updated_at_ms(stamp);
            board.insert(object.id().clone(), object);
        }
        Ok(())
    }

    async fn delete_objects(
        &self,
        board_id: &BoardId,
        object_ids: &[ObjectId],
    ) -> Result<u64, StoreError> {
        let mut boards = self.boards.lock().await;
        let Some(board) = boards.get_mut(board_id) else {
            return Ok(0);
        };
        let mut deleted = 0;
        for object_id in object_ids {
            if board.remove(object_id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// Per-board advisory lock registry.
///
/// Guards one mutating pipeline run per board: acquisition is fail-fast (a
/// concurrent mutating command is rejected, not queued) and release happens on
/// guard drop, so every exit path releases.
///
/// The lock is per-command, not per-object; two commands that run one after
/// the other may still read-modify-write the same object inconsistently. That
/// race is accepted.
#[derive(Debug, Clone, Default)]
pub struct BoardLocks {
    held: Arc<Mutex<BTreeSet<BoardId>>>,
}

impl BoardLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, board_id: &BoardId) -> Option<BoardLockGuard> {
        let mut held = self.held.lock().expect("board lock registry poisoned");
        if !held.insert(board_id.clone()) {
            return None;
        }
        Some(BoardLockGuard { held: self.held.clone(), board_id: board_id.clone() })
    }

    pub fn is_held(&self, board_id: &BoardId) -> bool {
        self.held.lock().expect("board lock registry poisoned").contains(board_id)
    }
}

#[derive(Debug)]
pub struct BoardLockGuard {
    held: Arc<Mutex<BTreeSet<BoardId>>>,
    board_id: BoardId,
}

impl BoardLockGuard {
    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }
}

impl Drop for BoardLockGuard {
    fn drop(&mut self) {
        let mut held = self.held.lock().expect("board lock registry poisoned");
        held.remove(&self.board_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectKind;

    fn board_id(value: &str) -> BoardId {
        BoardId::new(value).expect("board id")
    }

    fn object_id(value: &str) -> ObjectId {
        ObjectId::new(value).expect("object id")
    }

    #[tokio::test]
    async fn memory_store_assigns_timestamps_on_insert() {
        let store = MemoryBoardStore::new();
        let board = board_id("b1");
        let sticky = BoardObject::new(object_id("s1"), ObjectKind::Sticky);
        assert_eq!(sticky.updated_at_ms(), 0);

        store.insert_objects(&board, vec![sticky]).await.expect("insert");
        let objects = store.list_objects(&board).await.expect("list");
        assert_eq!(objects.len(), 1);
        assert!(objects[0].updated_at_ms() > 0);
    }

    #[tokio::test]
    async fn memory_store_update_rejects_unknown_object() {
        let store = MemoryBoardStore::new();
        let board = board_id("b1");
        let ghost = BoardObject::new(object_id("ghost"), ObjectKind::Rect);

        let err = store.update_objects(&board, vec![ghost]).await.unwrap_err();
        assert!(matches!(err, StoreError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn memory_store_delete_skips_absent_ids() {
        let store = MemoryBoardStore::new();
        let board = board_id("b1");
        store
            .insert_objects(&board, vec![BoardObject::new(object_id("s1"), ObjectKind::Sticky)])
            .await
            .expect("insert");

        let deleted = store
            .delete_objects(&board, &[object_id("s1"), object_id("missing")])
            .await
            .expect("delete");
        assert_eq!(deleted, 1);
        assert!(store.list_objects(&board).await.expect("list").is_empty());
    }

    #[test]
    fn board_lock_is_fail_fast_and_released_on_drop() {
        let locks = BoardLocks::new();
        let board = board_id("b1");

        let guard = locks.try_acquire(&board).expect("first acquisition");
        assert!(locks.try_acquire(&board).is_none());
        assert!(locks.is_held(&board));

        drop(guard);
        assert!(!locks.is_held(&board));
        assert!(locks.try_acquire(&board).is_some());
    }

    #[test]
    fn board_lock_distinct_boards_do_not_contend() {
        let locks = BoardLocks::new();
        let _a = locks.try_acquire(&board_id("a")).expect("lock a");
        let _b = locks.try_acquire(&board_id("b")).expect("lock b");
    }
}
