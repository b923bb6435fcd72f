// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote system-of-record: people, groups and the membership join table.
//!
//! Derived fields (`Person::groups`, `Group::members`, `Group::member_count`)
//! are never stored; membership lives only in `group_members`.

use std::collections::BTreeMap;
use std::path::Path;

use rc_core::protocol::ErrorCode;
use rc_core::{EntityKind, Membership, Record};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS people (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_people_owner ON people(owner_id);

CREATE TABLE IF NOT EXISTS roster_groups (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_groups_owner ON roster_groups(owner_id);

CREATE TABLE IF NOT EXISTS group_members (
    group_id TEXT NOT NULL,
    person_id TEXT NOT NULL,
    PRIMARY KEY (group_id, person_id)
);
CREATE INDEX IF NOT EXISTS idx_members_person ON group_members(person_id);
"#;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("already exists")]
    Duplicate,

    #[error("{0}")]
    Rejected(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::NotFound => ErrorCode::NotFound,
            StoreError::Duplicate => ErrorCode::Duplicate,
            StoreError::Rejected(_) => ErrorCode::Rejected,
            StoreError::Sqlite(_) | StoreError::Json(_) | StoreError::Io(_) => ErrorCode::Internal,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Person => "people",
        EntityKind::Group => "roster_groups",
    }
}

/// Checks a record and returns it with derived fields cleared.
fn prepare(record: Record) -> StoreResult<(Uuid, Record)> {
    record
        .validate()
        .map_err(|e| StoreError::Rejected(e.to_string()))?;
    let uuid = record
        .id()
        .remote()
        .ok_or_else(|| StoreError::Rejected(format!("{} is not a canonical id", record.id())))?;

    let record = match record {
        Record::Person(mut p) => {
            p.groups.clear();
            Record::Person(p)
        }
        Record::Group(mut g) => {
            g.set_members(Vec::new());
            Record::Group(g)
        }
    };
    Ok((uuid, record))
}

fn membership_keys(membership: &Membership) -> StoreResult<(Uuid, Uuid)> {
    match (membership.group_id.remote(), membership.person_id.remote()) {
        (Some(g), Some(p)) => Ok((g, p)),
        _ => Err(StoreError::Rejected(
            "membership ids must be canonical".into(),
        )),
    }
}

pub struct RemoteDb {
    conn: Connection,
}

impl RemoteDb {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(RemoteDb { conn })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(RemoteDb { conn })
    }

    pub fn fetch_all(&self, kind: EntityKind, owner_id: &str) -> StoreResult<Vec<Record>> {
        let sql = format!(
            "SELECT body FROM {} WHERE owner_id = ?1 ORDER BY rowid",
            table(kind)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let bodies = stmt
            .query_map(params![owner_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        bodies
            .iter()
            .map(|body| Ok(serde_json::from_str::<Record>(body)?))
            .collect()
    }

    fn exists(&self, kind: EntityKind, id: &Uuid) -> StoreResult<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table(kind));
        let found = self
            .conn
            .query_row(&sql, params![id.to_string()], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn create(&self, owner_id: &str, record: Record) -> StoreResult<Record> {
        if owner_id.trim().is_empty() {
            return Err(StoreError::Rejected("owner id cannot be empty".into()));
        }
        let (uuid, record) = prepare(record)?;
        if self.exists(record.kind(), &uuid)? {
            return Err(StoreError::Duplicate);
        }
        let sql = format!(
            "INSERT INTO {} (id, owner_id, body) VALUES (?1, ?2, ?3)",
            table(record.kind())
        );
        self.conn.execute(
            &sql,
            params![uuid.to_string(), owner_id, serde_json::to_string(&record)?],
        )?;
        Ok(record)
    }

    /// Overwrites an entity. The owner never changes.
    pub fn update(&self, record: Record) -> StoreResult<Record> {
        let (uuid, record) = prepare(record)?;
        let sql = format!("UPDATE {} SET body = ?2 WHERE id = ?1", table(record.kind()));
        let changed = self.conn.execute(
            &sql,
            params![uuid.to_string(), serde_json::to_string(&record)?],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(record)
    }

    /// Deletes an entity and every join row that references it.
    pub fn delete(&mut self, kind: EntityKind, id: Uuid) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1", table(kind)),
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        let column = match kind {
            EntityKind::Person => "person_id",
            EntityKind::Group => "group_id",
        };
        tx.execute(
            &format!("DELETE FROM group_members WHERE {} = ?1", column),
            params![id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn add_membership(&self, membership: &Membership) -> StoreResult<()> {
        let (group_id, person_id) = membership_keys(membership)?;
        if !self.exists(EntityKind::Group, &group_id)? {
            return Err(StoreError::Rejected(format!("unknown group {}", group_id)));
        }
        if !self.exists(EntityKind::Person, &person_id)? {
            return Err(StoreError::Rejected(format!("unknown person {}", person_id)));
        }
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO group_members (group_id, person_id) VALUES (?1, ?2)",
            params![group_id.to_string(), person_id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::Duplicate);
        }
        Ok(())
    }

    pub fn remove_membership(&self, membership: &Membership) -> StoreResult<()> {
        let (group_id, person_id) = membership_keys(membership)?;
        let changed = self.conn.execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND person_id = ?2",
            params![group_id.to_string(), person_id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Member ids for each requested group, in insertion order. Every
    /// requested group gets an entry, empty if it has no members.
    pub fn fetch_memberships(&self, group_ids: &[Uuid]) -> StoreResult<BTreeMap<Uuid, Vec<Uuid>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT person_id FROM group_members WHERE group_id = ?1 ORDER BY rowid")?;
        let mut out = BTreeMap::new();
        for group_id in group_ids {
            let ids = stmt
                .query_map(params![group_id.to_string()], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            let members = ids
                .iter()
                .filter_map(|s| Uuid::parse_str(s).ok())
                .collect();
            out.insert(*group_id, members);
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
