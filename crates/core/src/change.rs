// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending changes: mutations not yet confirmed by the remote store.
//!
//! A change always carries a full snapshot of the entity (or the membership
//! pair), never a diff. Replaying a create or update therefore overwrites the
//! remote copy wholesale and is safe to repeat.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::EntityId;
use crate::model::{Group, Membership, Person, Record};

/// What the change does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which collection the change targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEntity {
    Person,
    Group,
    Membership,
}

impl ChangeEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeEntity::Person => "person",
            ChangeEntity::Group => "group",
            ChangeEntity::Membership => "membership",
        }
    }
}

impl fmt::Display for ChangeEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot carried by a pending change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangePayload {
    Person(Person),
    Group(Group),
    Membership(Membership),
}

impl ChangePayload {
    pub fn entity(&self) -> ChangeEntity {
        match self {
            ChangePayload::Person(_) => ChangeEntity::Person,
            ChangePayload::Group(_) => ChangeEntity::Group,
            ChangePayload::Membership(_) => ChangeEntity::Membership,
        }
    }

    /// The id the change is keyed on. Memberships key on their group.
    pub fn target_id(&self) -> &EntityId {
        match self {
            ChangePayload::Person(p) => &p.id,
            ChangePayload::Group(g) => &g.id,
            ChangePayload::Membership(m) => &m.group_id,
        }
    }

    /// Returns the entity snapshot as a remote record, if this is not a membership.
    pub fn record(&self) -> Option<Record> {
        match self {
            ChangePayload::Person(p) => Some(Record::Person(p.clone())),
            ChangePayload::Group(g) => Some(Record::Group(g.clone())),
            ChangePayload::Membership(_) => None,
        }
    }

    /// True when every id the payload references is canonical.
    pub fn is_remote_eligible(&self) -> bool {
        match self {
            ChangePayload::Person(p) => p.id.is_remote_eligible(),
            ChangePayload::Group(g) => g.id.is_remote_eligible(),
            ChangePayload::Membership(m) => m.is_remote_eligible(),
        }
    }
}

/// A queued intent to mutate remote state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    pub kind: ChangeKind,
    pub entity: ChangeEntity,
    pub target_id: EntityId,
    pub payload: ChangePayload,
    pub enqueued_at: DateTime<Utc>,
    /// Owner whose session queued the change. Absent in logs written
    /// before changes were tagged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl PendingChange {
    /// Creates a change; `entity` and `target_id` are derived from the payload.
    pub fn new(kind: ChangeKind, payload: ChangePayload, enqueued_at: DateTime<Utc>) -> Self {
        PendingChange {
            kind,
            entity: payload.entity(),
            target_id: payload.target_id().clone(),
            payload,
            enqueued_at,
            owner_id: None,
        }
    }

    /// Tags the change with the owner that queued it.
    pub fn owned_by(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// True unless the change is tagged with a different owner.
    pub fn belongs_to(&self, owner_id: &str) -> bool {
        !matches!(self.owner_id.as_deref(), Some(other) if other != owner_id)
    }

    pub fn person(kind: ChangeKind, person: Person, enqueued_at: DateTime<Utc>) -> Self {
        Self::new(kind, ChangePayload::Person(person), enqueued_at)
    }

    pub fn group(kind: ChangeKind, group: Group, enqueued_at: DateTime<Utc>) -> Self {
        Self::new(kind, ChangePayload::Group(group), enqueued_at)
    }

    /// Membership add (`Create`) or removal (`Delete`).
    pub fn membership(kind: ChangeKind, membership: Membership, enqueued_at: DateTime<Utc>) -> Self {
        Self::new(kind, ChangePayload::Membership(membership), enqueued_at)
    }

    /// Returns true if this change targets the given entity id.
    pub fn targets(&self, entity: ChangeEntity, id: &EntityId) -> bool {
        self.entity == entity && &self.target_id == id
    }
}

impl fmt::Display for PendingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            ChangePayload::Membership(m) => write!(
                f,
                "{} membership {} <- {}",
                self.kind, m.group_id, m.person_id
            ),
            _ => write!(f, "{} {} {}", self.kind, self.entity, self.target_id),
        }
    }
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
