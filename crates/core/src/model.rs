// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Roster entity types: Person, Group and Membership.
//!
//! Memberships are owned by the remote join table. Locally they are
//! denormalized into [`Group::members`] and [`Person::groups`]; both are
//! derived and rebuilt with [`rebuild_derived`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::EntityId;

/// The two replicated entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Group,
}

impl EntityKind {
    /// Returns the string representation used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::Group => "group",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A person on the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    /// References to enrolled photos (paths or object keys).
    #[serde(default)]
    pub photos: Vec<String>,
    /// Groups this person belongs to. Derived from memberships.
    #[serde(default)]
    pub groups: Vec<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    /// Creates a person with no contact details and no memberships.
    pub fn new(id: EntityId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Person {
            id,
            name: name.into(),
            email: None,
            phone: None,
            allergies: Vec::new(),
            photos: Vec::new(),
            groups: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks the fields every stored person must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("person name cannot be empty".into()));
        }
        Ok(())
    }
}

/// A group of people, e.g. a class or a tour party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Person responsible for the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Member ids. Derived from memberships.
    #[serde(default)]
    pub members: Vec<EntityId>,
    /// Always `members.len()`.
    #[serde(default)]
    pub member_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Creates an empty group.
    pub fn new(id: EntityId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Group {
            id,
            name: name.into(),
            description: None,
            guide_id: None,
            notes: None,
            members: Vec::new(),
            member_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks the fields every stored group must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("group name cannot be empty".into()));
        }
        Ok(())
    }

    /// Replaces the member list, deduplicating and keeping the count in step.
    pub fn set_members(&mut self, members: impl IntoIterator<Item = EntityId>) {
        let mut seen = BTreeSet::new();
        self.members = members
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        self.member_count = self.members.len();
    }

    /// Returns true if the person is listed as a member.
    pub fn has_member(&self, person_id: &EntityId) -> bool {
        self.members.contains(person_id)
    }
}

/// A (group, person) pair from the membership join table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Membership {
    pub group_id: EntityId,
    pub person_id: EntityId,
}

impl Membership {
    pub fn new(group_id: EntityId, person_id: EntityId) -> Self {
        Membership {
            group_id,
            person_id,
        }
    }

    /// A membership replicates only when both sides are canonical.
    pub fn is_remote_eligible(&self) -> bool {
        self.group_id.is_remote_eligible() && self.person_id.is_remote_eligible()
    }
}

/// A person or group, as exchanged with the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Person(Person),
    Group(Group),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Person(_) => EntityKind::Person,
            Record::Group(_) => EntityKind::Group,
        }
    }

    pub fn id(&self) -> &EntityId {
        match self {
            Record::Person(p) => &p.id,
            Record::Group(g) => &g.id,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Record::Person(p) => p.validate(),
            Record::Group(g) => g.validate(),
        }
    }
}

/// Recomputes every group's member count and every person's group list
/// from the group member lists.
///
/// Members that do not resolve to a known person are dropped, so a person
/// deleted locally disappears from every group.
pub fn rebuild_derived(people: &mut [Person], groups: &mut [Group]) {
    let known: BTreeSet<EntityId> = people.iter().map(|p| p.id.clone()).collect();
    let mut by_person: BTreeMap<EntityId, Vec<EntityId>> = BTreeMap::new();

    for group in groups.iter_mut() {
        let members: Vec<EntityId> = group
            .members
            .iter()
            .filter(|id| known.contains(*id))
            .cloned()
            .collect();
        group.set_members(members);
        for member in &group.members {
            by_person
                .entry(member.clone())
                .or_default()
                .push(group.id.clone());
        }
    }

    for person in people.iter_mut() {
        person.groups = by_person.remove(&person.id).unwrap_or_default();
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
