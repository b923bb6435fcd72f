// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pull-merge of authoritative remote collections into the local cache.
//!
//! Conflict rule: a live pending change for an id wins over whatever the
//! remote currently holds; otherwise the remote wins. There are no
//! timestamps or versions involved.
//!
//! Everything here is pure; the orchestrator does the fetching and saving.

use std::collections::{BTreeMap, BTreeSet};

use rc_core::{
    rebuild_derived, ChangeEntity, ChangeKind, ChangePayload, EntityId, Group, PendingChange,
    Person,
};
use uuid::Uuid;

/// An entity keyed by id.
trait Keyed: Clone {
    const ENTITY: ChangeEntity;
    fn key(&self) -> &EntityId;
}

impl Keyed for Person {
    const ENTITY: ChangeEntity = ChangeEntity::Person;
    fn key(&self) -> &EntityId {
        &self.id
    }
}

impl Keyed for Group {
    const ENTITY: ChangeEntity = ChangeEntity::Group;
    fn key(&self) -> &EntityId {
        &self.id
    }
}

/// Counts from merging one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Remote snapshots adopted verbatim.
    pub adopted: usize,
    /// Remote snapshots ignored because a pending change holds the id.
    pub shielded: usize,
    /// Entities kept because the remote does not have them.
    pub local_only: usize,
}

/// Merges one collection. Remote order first, then local-only entities in
/// their local order.
fn merge_entities<T: Keyed>(
    local: &[T],
    remote: Vec<T>,
    pending: &[PendingChange],
) -> (Vec<T>, MergeStats) {
    let shielded: BTreeSet<&EntityId> = pending
        .iter()
        .filter(|c| c.entity == T::ENTITY)
        .map(|c| &c.target_id)
        .collect();
    let local_by_id: BTreeMap<&EntityId, &T> = local.iter().map(|e| (e.key(), e)).collect();

    let mut stats = MergeStats::default();
    let mut seen = BTreeSet::new();
    let mut merged = Vec::with_capacity(remote.len().max(local.len()));

    for entity in remote {
        let id = entity.key().clone();
        if !seen.insert(id.clone()) {
            continue;
        }
        if shielded.contains(&id) {
            stats.shielded += 1;
            // Absent locally means a pending delete: keep it absent.
            if let Some(kept) = local_by_id.get(&id) {
                merged.push((*kept).clone());
            }
        } else {
            stats.adopted += 1;
            merged.push(entity);
        }
    }

    for entity in local {
        if seen.insert(entity.key().clone()) {
            stats.local_only += 1;
            merged.push(entity.clone());
        }
    }

    (merged, stats)
}

/// Merges the remote people into the local cache.
///
/// Derived `groups` lists are left as they are; [`merge_groups`] rebuilds
/// them.
pub fn merge_people(
    local: &[Person],
    remote: Vec<Person>,
    pending: &[PendingChange],
) -> (Vec<Person>, MergeStats) {
    merge_entities(local, remote, pending)
}

/// Merges the remote groups into the local cache and recomputes every
/// derived membership field on both collections.
///
/// Member lists come from `memberships` (remote join rows keyed by group)
/// when the group was fetched, otherwise from the local copy. Members with
/// local-only ids are carried over from the local copy, then still-pending
/// membership changes are applied in log order.
pub fn merge_groups(
    local: &[Group],
    remote: Vec<Group>,
    memberships: &BTreeMap<Uuid, Vec<Uuid>>,
    pending: &[PendingChange],
    people: &mut [Person],
) -> (Vec<Group>, MergeStats) {
    let (mut groups, stats) = merge_entities(local, remote, pending);
    let local_by_id: BTreeMap<&EntityId, &Group> = local.iter().map(|g| (&g.id, g)).collect();

    for group in &mut groups {
        let local_members = local_by_id
            .get(&group.id)
            .map(|g| g.members.as_slice())
            .unwrap_or_default();

        let fetched = group.id.remote().and_then(|uuid| memberships.get(&uuid));
        let mut members: Vec<EntityId> = match fetched {
            Some(ids) => {
                let mut members: Vec<EntityId> = ids.iter().copied().map(EntityId::from).collect();
                members.extend(
                    local_members
                        .iter()
                        .filter(|id| !id.is_remote_eligible())
                        .cloned(),
                );
                members
            }
            None => local_members.to_vec(),
        };

        apply_pending_memberships(&group.id, &mut members, pending);
        group.set_members(members);
    }

    rebuild_derived(people, &mut groups);
    (groups, stats)
}

fn apply_pending_memberships(
    group_id: &EntityId,
    members: &mut Vec<EntityId>,
    pending: &[PendingChange],
) {
    for change in pending {
        let ChangePayload::Membership(m) = &change.payload else {
            continue;
        };
        if &m.group_id != group_id {
            continue;
        }
        match change.kind {
            ChangeKind::Delete => members.retain(|id| id != &m.person_id),
            ChangeKind::Create | ChangeKind::Update => {
                if !members.contains(&m.person_id) {
                    members.push(m.person_id.clone());
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
