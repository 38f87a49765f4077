// SPDX-FileCopyrightText: 2026 Ondine contributors
// SPDX-License-Identifier: MIT

//! Folder-backed board persistence: one JSON file per board.
//!
//! Writes go through a temp file and an atomic rename so a crashed process
//! never leaves a half-written board behind. Durable mode additionally syncs
//! file contents and the parent directory where the platform supports it.

use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{BoardId, BoardObject, ObjectId};

use super::{now_ms, BoardStore, StoreError};

const BOARDS_DIRNAME: &str = "boards";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence: temp file + atomic rename, no fsync.
    #[default]
    BestEffort,

    /// Slower persistence that additionally flushes file contents and the
    /// rename to stable storage where possible. Exact guarantees are
    /// platform/filesystem-dependent.
    Durable,
}

#[derive(Debug, Clone)]
pub struct BoardFolder {
    root: PathBuf,
    durability: WriteDurability,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BoardFile {
    objects: Vec<BoardObject>,
}

impl BoardFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), durability: WriteDurability::default() }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn board_path(&self, board_id: &BoardId) -> PathBuf {
        let file_stem = encode_board_file_stem(board_id.as_str());
        self.root.join(BOARDS_DIRNAME).join(format!("{file_stem}.json"))
    }

    fn load_board(&self, board_id: &BoardId) -> Result<BoardFile, StoreError> {
        let path = self.board_path(board_id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BoardFile::default()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&contents).map_err(|source| StoreError::Json { path, source })
    }

    fn save_board(&self, board_id: &BoardId, board: &BoardFile) -> Result<(), StoreError> {
        let path = self.board_path(board_id);
        let contents = serde_json::to_string_pretty(board)
            .map_err(|source| StoreError::Json { path: path.clone(), source })?;
        write_atomic(&path, contents.as_bytes(), self.durability)
    }
}

#[async_trait]
impl BoardStore for BoardFolder {
    async fn list_boards(&self) -> Result<Vec<BoardId>, StoreError> {
        let dir = self.root.join(BOARDS_DIRNAME);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };

        let mut board_ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io { path: dir.clone(), source })?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".json") else { continue };
            let Some(decoded) = decode_board_file_stem(stem) else { continue };
            if let Ok(board_id) = BoardId::new(decoded) {
                board_ids.push(board_id);
            }
        }
        board_ids.sort();
        Ok(board_ids)
    }

    async fn list_objects(&self, board_id: &BoardId) -> Result<Vec<BoardObject>, StoreError> {
        Ok(self.load_board(board_id)?.objects)
    }

    async fn insert_objects(
        &self,
        board_id: &BoardId,
        objects: Vec<BoardObject>,
    ) -> Result<(), StoreError> {
        let stamp = now_ms();
        let mut board = self.load_board(board_id)?;
        for mut object in objects {
            object.set_updated_at_ms(stamp);
            match board.objects.iter_mut().find(|existing| existing.id() == object.id()) {
                Some(existing) => *existing = object,
                None => board.objects.push(object),
            }
        }
        self.save_board(board_id, &board)
    }

    async fn update_objects(
        &self,
        board_id: &BoardId,
        objects: Vec<BoardObject>,
    ) -> Result<(), StoreError> {
        let stamp = now_ms();
        let mut board = self.load_board(board_id)?;
        for mut object in objects {
            object.set_updated_at_ms(stamp);
            let Some(existing) =
                board.objects.iter_mut().find(|existing| existing.id() == object.id())
            else {
                return Err(StoreError::ObjectNotFound {
                    board_id: board_id.clone(),
                    object_id: object.id().clone(),
                });
            };
            *existing = object;
        }
        self.save_board(board_id, &board)
    }

    async fn delete_objects(
        &self,
        board_id: &BoardId,
        object_ids: &[ObjectId],
    ) -> Result<u64, StoreError> {
        let mut board = self.load_board(board_id)?;
        let before = board.objects.len();
        board.objects.retain(|object| !object_ids.contains(object.id()));
        let deleted = (before - board.objects.len()) as u64;
        if deleted > 0 {
            self.save_board(board_id, &board)?;
        }
        Ok(deleted)
    }
}

/// Encodes a board id into a filesystem-safe file stem. Ids made of plain
/// ASCII word characters pass through unchanged; anything else is hex-encoded
/// behind a `~` marker so decoding stays unambiguous.
fn encode_board_file_stem(board_id: &str) -> String {
    let safe = !board_id.is_empty()
        && board_id != "."
        && board_id != ".."
        && board_id.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        && !board_id.starts_with('~')
        && !board_id.ends_with('.');
    if safe {
        return board_id.to_owned();
    }

    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(1 + board_id.len() * 2);
    out.push('~');
    for &b in board_id.as_bytes() {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

/// Inverse of [`encode_board_file_stem`]. Returns `None` for stems that no
/// valid board id encodes to, such as temp-file leftovers.
fn decode_board_file_stem(stem: &str) -> Option<String> {
    let Some(hex) = stem.strip_prefix('~') else {
        return Some(stem.to_owned());
    };
    if hex.is_empty() || hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    let raw = hex.as_bytes();
    for pair in raw.chunks(2) {
        let hi = (pair[0] as char).to_digit(16)?;
        let lo = (pair[1] as char).to_digit(16)?;
        bytes.push(((hi << 4) | lo) as u8);
    }
    String::from_utf8(bytes).ok()
}

fn write_atomic(path: &Path, contents: &[u8], durability: WriteDurability) -> Result<(), StoreError> {
    let Some(parent) = path.parent() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no parent"),
        });
    };
    fs::create_dir_all(parent)
        .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;

    let Some(file_name) = path.file_name() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let tmp_path = parent.join(format!(".ondine.tmp.{}.{nanos}", file_name.to_string_lossy()));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;
    file.write_all(contents)
        .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;
    if durability == WriteDurability::Durable {
        file.sync_all().map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;
    }
    drop(file);

    if let Err(source) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io { path: path.to_path_buf(), source });
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent)
                .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
            dir.sync_all()
                .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
        }
    }

    Ok(())
}
