// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers: an in-memory remote store with fault injection.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use rc_core::{EntityId, EntityKind, Group, Membership, Person, Record};
use uuid::Uuid;

use crate::gateway::{GatewayFuture, RemoteError, RemoteGateway, RemoteResult};

/// Fixed timestamp so snapshots compare equal across test steps.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_750_000_000 + secs, 0).unwrap()
}

pub fn person(name: &str) -> Person {
    Person::new(EntityId::generate(), name, ts(0))
}

pub fn group(name: &str) -> Group {
    Group::new(EntityId::generate(), name, ts(0))
}

#[derive(Default)]
struct Remote {
    people: BTreeMap<Uuid, (String, Person)>,
    groups: BTreeMap<Uuid, (String, Group)>,
    members: BTreeSet<(Uuid, Uuid)>,
    offline: bool,
    /// Calls left before every further call fails transiently.
    fail_after: Option<usize>,
    /// Calls that fail transiently before service resumes.
    fail_next: usize,
    reject_name: Option<String>,
    calls: Vec<String>,
}

/// In-memory remote system-of-record.
///
/// Behaves like `rc-remote`: derived fields are stripped on write and
/// deletes cascade to the join table.
#[derive(Default)]
pub struct MemoryGateway {
    remote: Mutex<Remote>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails transiently while set.
    pub fn set_offline(&self, offline: bool) {
        self.remote.lock().unwrap().offline = offline;
    }

    /// Lets `n` more calls through, then fails every call transiently.
    pub fn fail_after(&self, n: usize) {
        self.remote.lock().unwrap().fail_after = Some(n);
    }

    /// Fails the next `n` calls transiently, then recovers.
    pub fn fail_next(&self, n: usize) {
        self.remote.lock().unwrap().fail_next = n;
    }

    /// Rejects any record with this name as invalid.
    pub fn reject_name(&self, name: &str) {
        self.remote.lock().unwrap().reject_name = Some(name.to_string());
    }

    /// Names of the calls made so far, e.g. `"update person"`.
    pub fn calls(&self) -> Vec<String> {
        self.remote.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.remote.lock().unwrap().calls.len()
    }

    pub fn clear_calls(&self) {
        self.remote.lock().unwrap().calls.clear();
    }

    pub fn remote_person(&self, id: &EntityId) -> Option<Person> {
        let uuid = id.remote()?;
        self.remote.lock().unwrap().people.get(&uuid).map(|(_, p)| p.clone())
    }

    pub fn remote_group(&self, id: &EntityId) -> Option<Group> {
        let uuid = id.remote()?;
        self.remote.lock().unwrap().groups.get(&uuid).map(|(_, g)| g.clone())
    }

    pub fn people_count(&self) -> usize {
        self.remote.lock().unwrap().people.len()
    }

    pub fn has_membership(&self, group_id: &EntityId, person_id: &EntityId) -> bool {
        match (group_id.remote(), person_id.remote()) {
            (Some(g), Some(p)) => self.remote.lock().unwrap().members.contains(&(g, p)),
            _ => false,
        }
    }

    /// Writes a record directly, as another client would.
    pub fn seed(&self, owner_id: &str, record: Record) {
        let mut remote = self.remote.lock().unwrap();
        remote.put(owner_id, record);
    }

    /// Adds a join row directly, as another client would.
    pub fn seed_membership(&self, group_id: &EntityId, person_id: &EntityId) {
        let (g, p) = (group_id.remote().unwrap(), person_id.remote().unwrap());
        self.remote.lock().unwrap().members.insert((g, p));
    }

    /// Deletes a person directly, as another client would.
    pub fn remove_person(&self, id: &EntityId) {
        let uuid = id.remote().unwrap();
        let mut remote = self.remote.lock().unwrap();
        remote.people.remove(&uuid);
        remote.members.retain(|(_, p)| *p != uuid);
    }

    fn begin(&self, call: String) -> RemoteResult<std::sync::MutexGuard<'_, Remote>> {
        let mut remote = self.remote.lock().unwrap();
        remote.calls.push(call);
        if remote.offline {
            return Err(RemoteError::Transient("offline".into()));
        }
        if remote.fail_next > 0 {
            remote.fail_next -= 1;
            return Err(RemoteError::Transient("injected failure".into()));
        }
        match remote.fail_after {
            Some(0) => return Err(RemoteError::Transient("injected failure".into())),
            Some(n) => remote.fail_after = Some(n - 1),
            None => {}
        }
        Ok(remote)
    }
}

impl Remote {
    fn put(&mut self, owner_id: &str, record: Record) -> Record {
        match record {
            Record::Person(mut p) => {
                p.groups.clear();
                if let Some(uuid) = p.id.remote() {
                    self.people.insert(uuid, (owner_id.to_string(), p.clone()));
                }
                Record::Person(p)
            }
            Record::Group(mut g) => {
                g.set_members(Vec::new());
                if let Some(uuid) = g.id.remote() {
                    self.groups.insert(uuid, (owner_id.to_string(), g.clone()));
                }
                Record::Group(g)
            }
        }
    }

    fn exists(&self, kind: EntityKind, uuid: &Uuid) -> bool {
        match kind {
            EntityKind::Person => self.people.contains_key(uuid),
            EntityKind::Group => self.groups.contains_key(uuid),
        }
    }

    fn owner_of(&self, kind: EntityKind, uuid: &Uuid) -> Option<String> {
        match kind {
            EntityKind::Person => self.people.get(uuid).map(|(o, _)| o.clone()),
            EntityKind::Group => self.groups.get(uuid).map(|(o, _)| o.clone()),
        }
    }

    fn check(&self, record: &Record) -> RemoteResult<Uuid> {
        let uuid = record
            .id()
            .remote()
            .ok_or_else(|| RemoteError::Rejected("id is not canonical".into()))?;
        let name = match record {
            Record::Person(p) => &p.name,
            Record::Group(g) => &g.name,
        };
        if name.trim().is_empty() || self.reject_name.as_deref() == Some(name.as_str()) {
            return Err(RemoteError::Rejected(format!("invalid name {name:?}")));
        }
        Ok(uuid)
    }

    fn membership_keys(membership: &Membership) -> RemoteResult<(Uuid, Uuid)> {
        match (membership.group_id.remote(), membership.person_id.remote()) {
            (Some(g), Some(p)) => Ok((g, p)),
            _ => Err(RemoteError::Rejected("id is not canonical".into())),
        }
    }
}

impl RemoteGateway for MemoryGateway {
    fn fetch_all(&self, kind: EntityKind, owner_id: String) -> GatewayFuture<'_, Vec<Record>> {
        Box::pin(async move {
            let remote = self.begin(format!("fetch_all {kind}"))?;
            let records = match kind {
                EntityKind::Person => remote
                    .people
                    .values()
                    .filter(|(o, _)| *o == owner_id)
                    .map(|(_, p)| Record::Person(p.clone()))
                    .collect(),
                EntityKind::Group => remote
                    .groups
                    .values()
                    .filter(|(o, _)| *o == owner_id)
                    .map(|(_, g)| Record::Group(g.clone()))
                    .collect(),
            };
            Ok(records)
        })
    }

    fn create(&self, owner_id: String, record: Record) -> GatewayFuture<'_, Record> {
        Box::pin(async move {
            let mut remote = self.begin(format!("create {}", record.kind()))?;
            let uuid = remote.check(&record)?;
            if remote.exists(record.kind(), &uuid) {
                return Err(RemoteError::Duplicate);
            }
            Ok(remote.put(&owner_id, record))
        })
    }

    fn update(&self, record: Record) -> GatewayFuture<'_, Record> {
        Box::pin(async move {
            let mut remote = self.begin(format!("update {}", record.kind()))?;
            let uuid = remote.check(&record)?;
            let owner = remote
                .owner_of(record.kind(), &uuid)
                .ok_or(RemoteError::NotFound)?;
            Ok(remote.put(&owner, record))
        })
    }

    fn delete(&self, kind: EntityKind, id: Uuid) -> GatewayFuture<'_, ()> {
        Box::pin(async move {
            let mut remote = self.begin(format!("delete {kind}"))?;
            let removed = match kind {
                EntityKind::Person => remote.people.remove(&id).is_some(),
                EntityKind::Group => remote.groups.remove(&id).is_some(),
            };
            if !removed {
                return Err(RemoteError::NotFound);
            }
            remote.members.retain(|(g, p)| match kind {
                EntityKind::Person => *p != id,
                EntityKind::Group => *g != id,
            });
            Ok(())
        })
    }

    fn add_membership(&self, membership: Membership) -> GatewayFuture<'_, ()> {
        Box::pin(async move {
            let mut remote = self.begin("add_membership".into())?;
            let (g, p) = Remote::membership_keys(&membership)?;
            if !remote.groups.contains_key(&g) || !remote.people.contains_key(&p) {
                return Err(RemoteError::Rejected("membership references absent entity".into()));
            }
            remote.members.insert((g, p));
            Ok(())
        })
    }

    fn remove_membership(&self, membership: Membership) -> GatewayFuture<'_, ()> {
        Box::pin(async move {
            let mut remote = self.begin("remove_membership".into())?;
            let key = Remote::membership_keys(&membership)?;
            if remote.members.remove(&key) {
                Ok(())
            } else {
                Err(RemoteError::NotFound)
            }
        })
    }

    fn fetch_memberships(
        &self,
        group_ids: Vec<Uuid>,
    ) -> GatewayFuture<'_, BTreeMap<Uuid, Vec<Uuid>>> {
        Box::pin(async move {
            let remote = self.begin(format!("fetch_memberships {}", group_ids.len()))?;
            let mut map: BTreeMap<Uuid, Vec<Uuid>> = BTreeMap::new();
            for group_id in group_ids {
                let members = remote
                    .members
                    .iter()
                    .filter(|(g, _)| *g == group_id)
                    .map(|(_, p)| *p)
                    .collect();
                map.insert(group_id, members);
            }
            Ok(map)
        })
    }
}
