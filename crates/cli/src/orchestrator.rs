// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync orchestrator: the mutation API and the reconciliation pass.
//!
//! # Mutation flow
//!
//! ```text
//! caller ──► validate ──► commit to local cache + store
//!                              │
//!                  local-only id? ──yes──► LocalOnly
//!                              │
//!                 offline, or an older change
//!                 for the same id is queued? ──yes──► append to log ──► Queued
//!                              │
//!                        remote call ──ok──► Confirmed
//!                              ├──rejected──► Rejected
//!                              └──transient──► append to log ──► Queued
//! ```
//!
//! A reconciliation pass replays the pending log in order, then pulls both
//! collections from the remote and merges them into the cache (see
//! [`crate::reconcile`]).
//!
//! All state sits behind one async mutex, so mutations and passes never
//! interleave.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rc_core::{
    rebuild_derived, ChangeEntity, ChangeKind, ChangePayload, Collection, EntityId, EntityKind,
    Group, LocalStore, Membership, PendingChange, Person, Record,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::connectivity::{ConnectivitySignal, ReconnectWatch};
use crate::error::{Error, Result};
use crate::gateway::{self, RemoteError, RemoteGateway, RemoteResult};
use crate::queue::PendingLog;
use crate::reconcile::{merge_groups, merge_people, MergeStats};
use crate::scheduler::CoalescingScheduler;

/// Sync engine tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Upper bound for any single remote call.
    pub request_timeout: Duration,
    /// How long connectivity must hold before a reconnect triggers a pass.
    pub debounce: Duration,
    /// Groups per membership fetch.
    pub membership_batch_size: usize,
    /// Periodic reconciliation, if any.
    pub reconcile_interval: Option<Duration>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            request_timeout: Duration::from_secs(5),
            debounce: Duration::from_millis(500),
            membership_batch_size: 50,
            reconcile_interval: None,
        }
    }
}

/// Why a mutation was queued instead of confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueReason {
    /// The connectivity signal read offline.
    Offline,
    /// An older change for the same entity is still queued.
    Behind,
    /// The remote call failed in a way worth retrying.
    Transient(String),
}

/// Terminal state of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Committed locally; the id is not remote-eligible.
    LocalOnly,
    /// Committed locally and written to the remote.
    Confirmed,
    /// Committed locally and appended to the pending log.
    Queued(QueueReason),
    /// Committed locally; the remote refused it and it will not be retried.
    Rejected(String),
}

/// Result of draining the pending log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Changes confirmed and dropped from the log.
    pub replayed: usize,
    /// Changes the remote refused, with its reason. Dropped from the log.
    pub rejected: Vec<(PendingChange, String)>,
    /// Changes still in the log afterwards.
    pub remaining: usize,
    /// Set when a transient failure stopped the pass early.
    pub halted: Option<String>,
}

/// Result of one full reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub replay: ReplayReport,
    pub people: MergeStats,
    pub groups: MergeStats,
    pub completed_at: DateTime<Utc>,
}

/// Result of a reconciliation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Completed(ReconcileReport),
    /// A pass was already running; it will run once more on our behalf.
    Coalesced,
}

struct SyncState {
    store: LocalStore,
    log: PendingLog,
    people: Vec<Person>,
    groups: Vec<Group>,
}

struct Inner<G> {
    owner_id: String,
    gateway: G,
    state: Mutex<SyncState>,
    connectivity: ConnectivitySignal,
    scheduler: CoalescingScheduler,
    options: SyncOptions,
    cancel: CancellationToken,
}

/// Cloneable handle to the sync engine.
pub struct SyncOrchestrator<G> {
    inner: Arc<Inner<G>>,
}

impl<G> Clone for SyncOrchestrator<G> {
    fn clone(&self) -> Self {
        SyncOrchestrator {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: RemoteGateway + 'static> SyncOrchestrator<G> {
    /// Creates the engine, loading the cached collections for `owner_id`.
    pub fn new(
        owner_id: impl Into<String>,
        gateway: G,
        store: LocalStore,
        mut log: PendingLog,
        connectivity: ConnectivitySignal,
        options: SyncOptions,
    ) -> Self {
        let owner_id = owner_id.into();
        let held = log.claim(&owner_id);
        if held > 0 {
            warn!("holding {} pending change(s) queued by another owner", held);
        }
        let mut people: Vec<Person> = store.load(Collection::People, &owner_id);
        let mut groups: Vec<Group> = store.load(Collection::Groups, &owner_id);
        rebuild_derived(&mut people, &mut groups);
        debug!(
            "loaded {} people, {} groups, {} pending change(s) for {}",
            people.len(),
            groups.len(),
            log.len(),
            owner_id
        );

        SyncOrchestrator {
            inner: Arc::new(Inner {
                owner_id,
                gateway,
                state: Mutex::new(SyncState {
                    store,
                    log,
                    people,
                    groups,
                }),
                connectivity,
                scheduler: CoalescingScheduler::new(),
                options,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.inner.owner_id
    }

    pub fn connectivity(&self) -> &ConnectivitySignal {
        &self.inner.connectivity
    }

    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    // --- Reads ---

    pub async fn people(&self) -> Vec<Person> {
        self.inner.state.lock().await.people.clone()
    }

    pub async fn groups(&self) -> Vec<Group> {
        self.inner.state.lock().await.groups.clone()
    }

    pub async fn person(&self, id: &EntityId) -> Option<Person> {
        let state = self.inner.state.lock().await;
        state.people.iter().find(|p| &p.id == id).cloned()
    }

    pub async fn group(&self, id: &EntityId) -> Option<Group> {
        let state = self.inner.state.lock().await;
        state.groups.iter().find(|g| &g.id == id).cloned()
    }

    pub async fn pending_changes(&self) -> Vec<PendingChange> {
        self.inner.state.lock().await.log.entries().to_vec()
    }

    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        let state = self.inner.state.lock().await;
        state.store.last_sync(&self.inner.owner_id)
    }

    // --- Mutations ---

    /// Creates or updates a person.
    ///
    /// The derived `groups` list and the original `created_at` of an
    /// existing person are kept; `updated_at` is set to now.
    pub async fn save_person(&self, mut person: Person) -> Result<MutationOutcome> {
        person.validate().map_err(|e| Error::Validation(e.to_string()))?;
        let now = Utc::now();

        let mut state = self.inner.state.lock().await;
        let kind = match state.people.iter_mut().find(|p| p.id == person.id) {
            Some(existing) => {
                person.created_at = existing.created_at;
                person.groups = existing.groups.clone();
                person.updated_at = now;
                *existing = person.clone();
                ChangeKind::Update
            }
            None => {
                person.groups.clear();
                person.updated_at = now;
                state.people.push(person.clone());
                ChangeKind::Create
            }
        };
        self.persist(&state, Collection::People);

        let change = PendingChange::person(kind, person, now);
        Ok(self.write_through(&mut state, change).await)
    }

    /// Deletes a person and drops it from every group.
    pub async fn delete_person(&self, id: &EntityId) -> Result<MutationOutcome> {
        let mut state = self.inner.state.lock().await;
        let index = state
            .people
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| Error::PersonNotFound(id.to_string()))?;
        let removed = state.people.remove(index);

        let SyncState { people, groups, .. } = &mut *state;
        rebuild_derived(people, groups);
        self.persist(&state, Collection::People);
        self.persist(&state, Collection::Groups);

        let change = PendingChange::person(ChangeKind::Delete, removed, Utc::now());
        Ok(self.write_through(&mut state, change).await)
    }

    /// Creates or updates a group.
    ///
    /// The derived member list and the original `created_at` of an existing
    /// group are kept; `updated_at` is set to now.
    pub async fn save_group(&self, mut group: Group) -> Result<MutationOutcome> {
        group.validate().map_err(|e| Error::Validation(e.to_string()))?;
        let now = Utc::now();

        let mut state = self.inner.state.lock().await;
        let kind = match state.groups.iter_mut().find(|g| g.id == group.id) {
            Some(existing) => {
                group.created_at = existing.created_at;
                group.set_members(existing.members.clone());
                group.updated_at = now;
                *existing = group.clone();
                ChangeKind::Update
            }
            None => {
                group.set_members(Vec::new());
                group.updated_at = now;
                state.groups.push(group.clone());
                ChangeKind::Create
            }
        };
        self.persist(&state, Collection::Groups);

        let change = PendingChange::group(kind, group, now);
        Ok(self.write_through(&mut state, change).await)
    }

    /// Deletes a group and clears it from every person.
    pub async fn delete_group(&self, id: &EntityId) -> Result<MutationOutcome> {
        let mut state = self.inner.state.lock().await;
        let index = state
            .groups
            .iter()
            .position(|g| &g.id == id)
            .ok_or_else(|| Error::GroupNotFound(id.to_string()))?;
        let removed = state.groups.remove(index);

        let SyncState { people, groups, .. } = &mut *state;
        rebuild_derived(people, groups);
        self.persist(&state, Collection::Groups);
        self.persist(&state, Collection::People);

        let change = PendingChange::group(ChangeKind::Delete, removed, Utc::now());
        Ok(self.write_through(&mut state, change).await)
    }

    /// Adds a person to a group. Adding an existing member is not an error.
    pub async fn add_member(
        &self,
        group_id: &EntityId,
        person_id: &EntityId,
    ) -> Result<MutationOutcome> {
        self.change_membership(ChangeKind::Create, group_id, person_id)
            .await
    }

    /// Removes a person from a group. Removing a non-member is not an error.
    pub async fn remove_member(
        &self,
        group_id: &EntityId,
        person_id: &EntityId,
    ) -> Result<MutationOutcome> {
        self.change_membership(ChangeKind::Delete, group_id, person_id)
            .await
    }

    async fn change_membership(
        &self,
        kind: ChangeKind,
        group_id: &EntityId,
        person_id: &EntityId,
    ) -> Result<MutationOutcome> {
        let mut state = self.inner.state.lock().await;
        if !state.people.iter().any(|p| &p.id == person_id) {
            return Err(Error::PersonNotFound(person_id.to_string()));
        }
        let group = state
            .groups
            .iter_mut()
            .find(|g| &g.id == group_id)
            .ok_or_else(|| Error::GroupNotFound(group_id.to_string()))?;

        let mut members = group.members.clone();
        match kind {
            ChangeKind::Delete => members.retain(|id| id != person_id),
            ChangeKind::Create | ChangeKind::Update => members.push(person_id.clone()),
        }
        group.set_members(members);

        let SyncState { people, groups, .. } = &mut *state;
        rebuild_derived(people, groups);
        self.persist(&state, Collection::Groups);
        self.persist(&state, Collection::People);

        let membership = Membership::new(group_id.clone(), person_id.clone());
        let change = PendingChange::membership(kind, membership, Utc::now());
        Ok(self.write_through(&mut state, change).await)
    }

    /// Saves one collection. Failures are logged; the cache stays authoritative.
    fn persist(&self, state: &SyncState, collection: Collection) {
        let result = match collection {
            Collection::People => {
                state
                    .store
                    .save(collection, &state.people, &self.inner.owner_id)
            }
            Collection::Groups => {
                state
                    .store
                    .save(collection, &state.groups, &self.inner.owner_id)
            }
        };
        if let Err(e) = result {
            warn!("failed to save {} to local store: {}", collection.record_name(), e);
        }
    }

    /// Sends a locally committed change to the remote, or queues it.
    async fn write_through(&self, state: &mut SyncState, change: PendingChange) -> MutationOutcome {
        if !change.payload.is_remote_eligible() {
            info!("{} involves a local-only id, not replicating", change);
            return MutationOutcome::LocalOnly;
        }
        let change = change.owned_by(self.inner.owner_id.as_str());
        if !self.inner.connectivity.is_online() {
            debug!("offline, queueing {}", change);
            enqueue(state, change);
            return MutationOutcome::Queued(QueueReason::Offline);
        }
        if has_older_change(&state.log, &change) {
            debug!("older change pending, queueing {} behind it", change);
            enqueue(state, change);
            return MutationOutcome::Queued(QueueReason::Behind);
        }

        match self.apply_remote(&change).await {
            Ok(()) => {
                debug!("confirmed {}", change);
                MutationOutcome::Confirmed
            }
            Err(RemoteError::Rejected(reason)) => {
                warn!("remote rejected {}: {}", change, reason);
                MutationOutcome::Rejected(reason)
            }
            Err(e) => {
                warn!("remote write failed for {}, queueing: {}", change, e);
                let reason = e.to_string();
                enqueue(state, change);
                MutationOutcome::Queued(QueueReason::Transient(reason))
            }
        }
    }

    /// Applies one change to the remote. Idempotent outcomes count as success.
    async fn apply_remote(&self, change: &PendingChange) -> RemoteResult<()> {
        let remote = &self.inner.gateway;
        let owner_id = self.inner.owner_id.as_str();

        match (&change.payload, change.kind) {
            (ChangePayload::Person(_) | ChangePayload::Group(_), ChangeKind::Delete) => {
                let kind = match change.entity {
                    ChangeEntity::Group => EntityKind::Group,
                    _ => EntityKind::Person,
                };
                let uuid = remote_uuid(&change.target_id)?;
                match self.guarded(remote.delete(kind, uuid)).await {
                    Err(RemoteError::NotFound) => Ok(()),
                    other => other,
                }
            }
            (ChangePayload::Person(p), _) => self
                .guarded(gateway::upsert(remote, owner_id, Record::Person(p.clone())))
                .await
                .map(drop),
            (ChangePayload::Group(g), _) => self
                .guarded(gateway::upsert(remote, owner_id, Record::Group(g.clone())))
                .await
                .map(drop),
            (ChangePayload::Membership(m), ChangeKind::Delete) => {
                match self.guarded(remote.remove_membership(m.clone())).await {
                    Err(RemoteError::NotFound) => Ok(()),
                    other => other,
                }
            }
            (ChangePayload::Membership(m), _) => {
                match self.guarded(remote.add_membership(m.clone())).await {
                    Err(RemoteError::Duplicate) => Ok(()),
                    other => other,
                }
            }
        }
    }

    /// Bounds a remote call by the request timeout and shutdown.
    async fn guarded<T, F>(&self, call: F) -> RemoteResult<T>
    where
        F: Future<Output = RemoteResult<T>>,
    {
        let timeout = self.inner.options.request_timeout;
        tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => {
                Err(RemoteError::Transient("cancelled".into()))
            }
            result = tokio::time::timeout(timeout, call) => {
                result.unwrap_or_else(|_| {
                    Err(RemoteError::Transient(format!("timed out after {:?}", timeout)))
                })
            }
        }
    }

    // --- Replay and reconciliation ---

    /// Drains the pending log against the remote in enqueue order.
    pub async fn replay_all(&self) -> Result<ReplayReport> {
        if !self.inner.connectivity.is_online() {
            return Err(Error::ConnectivityUnavailable);
        }
        let mut state = self.inner.state.lock().await;
        Ok(self.replay_locked(&mut state).await)
    }

    async fn replay_locked(&self, state: &mut SyncState) -> ReplayReport {
        let mut report = ReplayReport::default();
        if state.log.is_empty() {
            return report;
        }

        let mut remaining = Vec::new();
        let mut entries = state.log.entries().to_vec().into_iter();
        while let Some(change) = entries.next() {
            if !change.payload.is_remote_eligible() {
                info!("dropping local-only pending change {}", change);
                continue;
            }
            match self.apply_remote(&change).await {
                Ok(()) => {
                    debug!("replayed {}", change);
                    report.replayed += 1;
                }
                Err(RemoteError::Rejected(reason)) => {
                    warn!("remote rejected pending {}, dropping: {}", change, reason);
                    report.rejected.push((change, reason));
                }
                Err(e) => {
                    warn!("replay halted at {}: {}", change, e);
                    report.halted = Some(e.to_string());
                    remaining.push(change);
                    remaining.extend(entries.by_ref());
                    break;
                }
            }
        }

        if remaining.len() != state.log.len() {
            if let Err(e) = state.log.replace(remaining) {
                warn!("failed to rewrite pending log: {}", e);
            }
        }
        report.remaining = state.log.len();
        info!(
            "replay: {} confirmed, {} rejected, {} remaining",
            report.replayed,
            report.rejected.len(),
            report.remaining
        );
        report
    }

    /// Requests a reconciliation pass.
    ///
    /// If a pass is already running this returns
    /// [`ReconcileOutcome::Coalesced`] at once, and the running pass goes
    /// round exactly once more before it finishes.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome> {
        let Some(mut guard) = self.inner.scheduler.try_start() else {
            debug!("reconcile already running, coalesced");
            return Ok(ReconcileOutcome::Coalesced);
        };

        loop {
            let result = self.reconcile_pass().await;
            if !guard.follow_up() {
                return result.map(ReconcileOutcome::Completed);
            }
            match result {
                Ok(_) => debug!("running coalesced follow-up pass"),
                Err(e) => warn!("reconcile pass failed, running follow-up: {}", e),
            }
        }
    }

    async fn reconcile_pass(&self) -> Result<ReconcileReport> {
        if self.inner.cancel.is_cancelled() {
            return Err(Error::Shutdown);
        }
        if !self.inner.connectivity.is_online() {
            return Err(Error::ConnectivityUnavailable);
        }

        let remote = &self.inner.gateway;
        let owner_id = &self.inner.owner_id;
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;

        let replay = self.replay_locked(state).await;
        let pending = state.log.entries().to_vec();

        // People first, so a failure below leaves at most groups stale.
        let remote_people: Vec<Person> = self
            .guarded(remote.fetch_all(EntityKind::Person, owner_id.clone()))
            .await?
            .into_iter()
            .filter_map(|r| match r {
                Record::Person(p) => Some(p),
                Record::Group(_) => None,
            })
            .collect();
        let (mut people, people_stats) = merge_people(&state.people, remote_people, &pending);
        rebuild_derived(&mut people, &mut state.groups);
        state.people = people;
        self.persist(state, Collection::People);

        let remote_groups: Vec<Group> = self
            .guarded(remote.fetch_all(EntityKind::Group, owner_id.clone()))
            .await?
            .into_iter()
            .filter_map(|r| match r {
                Record::Group(g) => Some(g),
                Record::Person(_) => None,
            })
            .collect();
        let group_ids: Vec<Uuid> = remote_groups.iter().filter_map(|g| g.id.remote()).collect();
        let joins = self
            .guarded(gateway::fetch_memberships_batched(
                remote,
                &group_ids,
                self.inner.options.membership_batch_size,
            ))
            .await?;
        let (groups, group_stats) =
            merge_groups(&state.groups, remote_groups, &joins, &pending, &mut state.people);
        state.groups = groups;
        self.persist(state, Collection::Groups);
        self.persist(state, Collection::People);

        let completed_at = Utc::now();
        state.store.set_last_sync(owner_id, completed_at)?;
        info!(
            "reconciled {}: people {:?}, groups {:?}",
            owner_id, people_stats, group_stats
        );

        Ok(ReconcileReport {
            replay,
            people: people_stats,
            groups: group_stats,
            completed_at,
        })
    }

    /// Runs a pass on behalf of a background trigger, logging the result.
    async fn background_reconcile(&self, trigger: &str) {
        match self.reconcile().await {
            Ok(ReconcileOutcome::Completed(report)) => info!(
                "{} sync done: {} replayed, {} still pending",
                trigger, report.replay.replayed, report.replay.remaining
            ),
            Ok(ReconcileOutcome::Coalesced) => debug!("{} sync coalesced", trigger),
            Err(e) => warn!("{} sync failed: {}", trigger, e),
        }
    }

    /// Spawns the background task reacting to reconnects and the periodic
    /// timer. It stops on [`shutdown`](Self::shutdown).
    pub fn spawn_watcher(&self) -> JoinHandle<()> {
        let this = self.clone();
        let cancel = self.inner.cancel.clone();
        let mut reconnect = ReconnectWatch::new(
            self.inner.connectivity.subscribe(),
            self.inner.options.debounce,
        );
        let mut ticker = self
            .inner
            .options
            .reconcile_interval
            .map(|period| {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    reconnected = reconnect.next_reconnect() => {
                        if !reconnected {
                            break;
                        }
                        info!("connectivity restored, syncing");
                        this.background_reconcile("reconnect").await;
                    }
                    _ = tick(&mut ticker) => {
                        if this.inner.connectivity.is_online() {
                            this.background_reconcile("periodic").await;
                        }
                    }
                }
            }
            debug!("sync watcher stopped");
        })
    }

    /// Cancels in-flight remote calls and stops the watcher.
    ///
    /// Mutations keep working afterwards; their remote writes are queued.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }
}

/// Waits for the next periodic tick, or forever if there is no timer.
async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn enqueue(state: &mut SyncState, change: PendingChange) {
    if let Err(e) = state.log.append(change) {
        warn!("failed to persist pending change: {}", e);
    }
}

/// True if replaying the log later could reorder this change against an
/// older one touching the same entity.
fn has_older_change(log: &PendingLog, change: &PendingChange) -> bool {
    match &change.payload {
        ChangePayload::Person(p) => log.has_pending(ChangeEntity::Person, &p.id),
        ChangePayload::Group(g) => {
            log.has_pending(ChangeEntity::Group, &g.id)
                || log.has_pending(ChangeEntity::Membership, &g.id)
        }
        ChangePayload::Membership(m) => {
            log.has_pending(ChangeEntity::Membership, &m.group_id)
                || log.has_pending(ChangeEntity::Group, &m.group_id)
                || log.has_pending(ChangeEntity::Person, &m.person_id)
        }
    }
}

fn remote_uuid(id: &EntityId) -> RemoteResult<Uuid> {
    id.remote()
        .ok_or_else(|| RemoteError::Rejected(format!("{id} is not remote-eligible")))
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
