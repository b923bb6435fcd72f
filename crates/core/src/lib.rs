// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! rc-core: Shared library for the rollcall roster sync engine
//!
//! This crate provides the entity model, tagged identifiers, pending-change
//! records, the durable local store and the gateway wire protocol used by
//! both the `rollcall` client and the `rc-remote` server.

pub mod change;
pub mod error;
pub mod id;
pub mod jsonl;
pub mod model;
pub mod protocol;
pub mod store;

pub use change::{ChangeEntity, ChangeKind, ChangePayload, PendingChange};
pub use error::{Error, Result};
pub use id::EntityId;
pub use model::{rebuild_derived, EntityKind, Group, Membership, Person, Record};
pub use store::{Collection, LocalStore};
