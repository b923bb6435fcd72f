// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending change log: mutations not yet confirmed by the remote store.
//!
//! Uses JSONL format for durability - each change is written as a single line
//! and fsynced immediately. Replay drains the log in enqueue order; whatever
//! is left afterwards is written back in one atomic rewrite.

use std::path::{Path, PathBuf};

use rc_core::{jsonl, ChangeEntity, EntityId, PendingChange};
use tracing::warn;

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Reading or writing the log file failed.
    #[error("pending log storage error: {0}")]
    Storage(#[from] rc_core::Error),

    /// Creating the log directory failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Ordered, durable list of pending changes.
///
/// The whole log is mirrored in memory; the file is only read at open.
/// No deduplication happens: two saves of the same entity are two entries.
///
/// Changes tagged with another owner are held aside after [`claim`]: they
/// are never replayed here but survive every rewrite of the file.
///
/// [`claim`]: PendingLog::claim
#[derive(Debug)]
pub struct PendingLog {
    /// Backing file, or `None` for a memory-only log.
    path: Option<PathBuf>,
    entries: Vec<PendingChange>,
    held: Vec<PendingChange>,
}

impl PendingLog {
    /// Opens the log at `path`, creating its directory if needed.
    ///
    /// Lines that fail to parse are dropped with a warning.
    pub fn open(path: &Path) -> QueueResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let read = jsonl::read_lossy::<PendingChange>(path)?;
        if !read.skipped.is_empty() {
            warn!(
                "skipped {} unreadable pending change(s) in {} (lines {:?})",
                read.skipped.len(),
                path.display(),
                read.skipped
            );
        }

        Ok(PendingLog {
            path: Some(path.to_path_buf()),
            entries: read.records,
            held: Vec::new(),
        })
    }

    /// A log that never touches disk.
    pub fn in_memory() -> Self {
        PendingLog {
            path: None,
            entries: Vec::new(),
            held: Vec::new(),
        }
    }

    /// Appends a change, persisting it before returning.
    ///
    /// The change stays in the in-memory log even if the write fails, so the
    /// current process still replays it.
    pub fn append(&mut self, change: PendingChange) -> QueueResult<()> {
        let persisted = match &self.path {
            Some(path) => jsonl::append(path, &change),
            None => Ok(()),
        };
        self.entries.push(change);
        persisted.map_err(QueueError::from)
    }

    /// All pending changes, oldest first.
    pub fn entries(&self) -> &[PendingChange] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if any pending change targets `id` in `entity`.
    pub fn has_pending(&self, entity: ChangeEntity, id: &EntityId) -> bool {
        self.entries.iter().any(|c| c.targets(entity, id))
    }

    /// Replaces the log contents, e.g. with the changes a replay left behind.
    ///
    /// Held changes are written back ahead of `entries`.
    pub fn replace(&mut self, entries: Vec<PendingChange>) -> QueueResult<()> {
        if let Some(path) = &self.path {
            let all: Vec<&PendingChange> = self.held.iter().chain(entries.iter()).collect();
            jsonl::write_all(path, &all)?;
        }
        self.entries = entries;
        Ok(())
    }

    /// Keeps only changes `owner_id` may replay, holding the rest aside.
    ///
    /// Untagged changes are claimed. Returns how many were held.
    pub fn claim(&mut self, owner_id: &str) -> usize {
        let (mine, others): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|c| c.belongs_to(owner_id));
        self.entries = mine;
        self.held.extend(others);
        self.held.len()
    }

    /// Changes queued by other owners.
    pub fn held(&self) -> &[PendingChange] {
        &self.held
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
