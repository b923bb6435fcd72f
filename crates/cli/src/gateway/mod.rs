// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote gateway: stateless CRUD against the remote entity store.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Orchestrator │────►│ RemoteGateway │────►│  Transport  │────►│  rc-remote  │
//! │              │◄────│  (WsGateway)  │◄────│   (trait)   │◄────│   server    │
//! └──────────────┘     └───────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! The gateway holds no business logic. It owns nothing but its connection;
//! every decision about retrying, queueing or merging lives in the
//! orchestrator.

mod transport;
mod ws;

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rc_core::{EntityKind, Membership, Record};
use tracing::debug;
use uuid::Uuid;

pub use transport::{
    round_trip, Deadlines, Transport, TransportError, TransportFuture, TransportResult,
    WebSocketTransport,
};
pub use ws::{GatewayConfig, WsGateway};

/// Error returned by remote gateway calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The target entity or membership does not exist remotely.
    #[error("not found on remote")]
    NotFound,

    /// The entity or membership already exists remotely.
    #[error("already exists on remote")]
    Duplicate,

    /// The remote refused the payload; resubmitting it unchanged fails again.
    #[error("rejected by remote: {0}")]
    Rejected(String),

    /// Network, server or timeout failure. Worth retrying later.
    #[error("remote unavailable: {0}")]
    Transient(String),
}

impl RemoteError {
    /// Returns true if the same call may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Transient(_))
    }
}

/// Result type for gateway calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Boxed future returned by gateway calls.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = RemoteResult<T>> + Send + 'a>>;

/// CRUD surface of the remote system-of-record.
///
/// Implementations are called only with canonical ids; local-only entities
/// are filtered out before they get here.
pub trait RemoteGateway: Send + Sync {
    /// Fetches every entity of `kind` owned by `owner_id`.
    fn fetch_all(&self, kind: EntityKind, owner_id: String) -> GatewayFuture<'_, Vec<Record>>;

    /// Inserts a new entity. Fails with [`RemoteError::Duplicate`] if the id exists.
    fn create(&self, owner_id: String, record: Record) -> GatewayFuture<'_, Record>;

    /// Overwrites an entity. Fails with [`RemoteError::NotFound`] if absent.
    fn update(&self, record: Record) -> GatewayFuture<'_, Record>;

    /// Deletes an entity and its memberships.
    fn delete(&self, kind: EntityKind, id: Uuid) -> GatewayFuture<'_, ()>;

    /// Adds a membership. Adding an existing membership succeeds.
    fn add_membership(&self, membership: Membership) -> GatewayFuture<'_, ()>;

    /// Removes a membership.
    fn remove_membership(&self, membership: Membership) -> GatewayFuture<'_, ()>;

    /// Fetches member person ids for each of the given groups.
    fn fetch_memberships(
        &self,
        group_ids: Vec<Uuid>,
    ) -> GatewayFuture<'_, BTreeMap<Uuid, Vec<Uuid>>>;
}

impl<G: RemoteGateway + ?Sized> RemoteGateway for Arc<G> {
    fn fetch_all(&self, kind: EntityKind, owner_id: String) -> GatewayFuture<'_, Vec<Record>> {
        (**self).fetch_all(kind, owner_id)
    }

    fn create(&self, owner_id: String, record: Record) -> GatewayFuture<'_, Record> {
        (**self).create(owner_id, record)
    }

    fn update(&self, record: Record) -> GatewayFuture<'_, Record> {
        (**self).update(record)
    }

    fn delete(&self, kind: EntityKind, id: Uuid) -> GatewayFuture<'_, ()> {
        (**self).delete(kind, id)
    }

    fn add_membership(&self, membership: Membership) -> GatewayFuture<'_, ()> {
        (**self).add_membership(membership)
    }

    fn remove_membership(&self, membership: Membership) -> GatewayFuture<'_, ()> {
        (**self).remove_membership(membership)
    }

    fn fetch_memberships(
        &self,
        group_ids: Vec<Uuid>,
    ) -> GatewayFuture<'_, BTreeMap<Uuid, Vec<Uuid>>> {
        (**self).fetch_memberships(group_ids)
    }
}

/// Writes `record` to the remote whether or not it exists yet.
///
/// Update is always attempted first; a not-found answer falls back to
/// create. If a concurrent writer created the entity in between, the create
/// comes back as a duplicate and the update is retried once.
pub async fn upsert<G: RemoteGateway + ?Sized>(
    gateway: &G,
    owner_id: &str,
    record: Record,
) -> RemoteResult<Record> {
    match gateway.update(record.clone()).await {
        Err(RemoteError::NotFound) => {
            debug!("{} {} absent remotely, creating", record.kind(), record.id());
            match gateway.create(owner_id.to_string(), record.clone()).await {
                Err(RemoteError::Duplicate) => gateway.update(record).await,
                other => other,
            }
        }
        other => other,
    }
}

/// Fetches memberships for `group_ids` in chunks of at most `batch_size`.
pub async fn fetch_memberships_batched<G: RemoteGateway + ?Sized>(
    gateway: &G,
    group_ids: &[Uuid],
    batch_size: usize,
) -> RemoteResult<BTreeMap<Uuid, Vec<Uuid>>> {
    let mut merged = BTreeMap::new();
    for chunk in group_ids.chunks(batch_size.max(1)) {
        let part = gateway.fetch_memberships(chunk.to_vec()).await?;
        merged.extend(part);
    }
    Ok(merged)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
