// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed durable local store.
//!
//! The store keeps a handful of named records. Each entity collection is one
//! record, `{ "ownerId": .., "collection": [..], "timestamp": .. }`, always
//! rewritten as a whole. The last-sync marker is a record of its own.
//!
//! Reads never fail on content: a missing record, a record owned by another
//! identity and a record that no longer parses all come back as a cache miss.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// SQL schema for the local record store.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    name TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

const LAST_SYNC_RECORD: &str = "last_sync";

/// The cached entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    People,
    Groups,
}

impl Collection {
    /// Name of the record holding this collection.
    pub fn record_name(&self) -> &'static str {
        match self {
            Collection::People => "people",
            Collection::Groups => "groups",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionRecordRef<'a, T> {
    owner_id: &'a str,
    collection: &'a [T],
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionRecord<T> {
    owner_id: String,
    collection: Vec<T>,
    #[allow(dead_code)]
    timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkerRecord {
    owner_id: String,
    timestamp: DateTime<Utc>,
}

/// Durable local store for the cached collections and the last-sync marker.
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    /// Opens the store at the given path, creating it if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(LocalStore { conn })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(LocalStore { conn })
    }

    /// Loads a collection for `owner_id`.
    ///
    /// Returns an empty vec on a cache miss, including when the record
    /// belongs to a different owner or cannot be parsed.
    pub fn load<T: DeserializeOwned>(&self, collection: Collection, owner_id: &str) -> Vec<T> {
        let name = collection.record_name();
        let Some(body) = self.read_body(name) else {
            return Vec::new();
        };

        match serde_json::from_str::<CollectionRecord<T>>(&body) {
            Ok(record) if record.owner_id == owner_id => record.collection,
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!("discarding unreadable '{}' record: {}", name, e);
                Vec::new()
            }
        }
    }

    /// Replaces a collection wholesale, tagging it with `owner_id`.
    pub fn save<T: Serialize>(
        &self,
        collection: Collection,
        entities: &[T],
        owner_id: &str,
    ) -> Result<()> {
        let record = CollectionRecordRef {
            owner_id,
            collection: entities,
            timestamp: Utc::now(),
        };
        let body = serde_json::to_string(&record)?;
        self.write_body(collection.record_name(), &body, record.timestamp)
    }

    /// Returns when `owner_id` last completed a full reconciliation pass.
    pub fn last_sync(&self, owner_id: &str) -> Option<DateTime<Utc>> {
        let body = self.read_body(LAST_SYNC_RECORD)?;
        match serde_json::from_str::<MarkerRecord>(&body) {
            Ok(marker) if marker.owner_id == owner_id => Some(marker.timestamp),
            Ok(_) => None,
            Err(e) => {
                warn!("discarding unreadable last-sync marker: {}", e);
                None
            }
        }
    }

    /// Records a completed reconciliation pass for `owner_id`.
    pub fn set_last_sync(&self, owner_id: &str, at: DateTime<Utc>) -> Result<()> {
        let marker = MarkerRecord {
            owner_id: owner_id.to_string(),
            timestamp: at,
        };
        let body = serde_json::to_string(&marker)?;
        self.write_body(LAST_SYNC_RECORD, &body, at)
    }

    /// Reads a raw record body. Database errors are logged and read as absent.
    fn read_body(&self, name: &str) -> Option<String> {
        let result = self
            .conn
            .query_row(
                "SELECT body FROM records WHERE name = ?1",
                params![name],
                |row| row.get::<_, String>(0),
            )
            .optional();

        match result {
            Ok(body) => body,
            Err(e) => {
                warn!("failed to read '{}' record: {}", name, e);
                None
            }
        }
    }

    fn write_body(&self, name: &str, body: &str, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO records (name, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![name, body, at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Overwrites a record body verbatim (for corruption tests).
    #[cfg(test)]
    pub(crate) fn write_raw(&self, name: &str, body: &str) -> Result<()> {
        self.write_body(name, body, Utc::now())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
