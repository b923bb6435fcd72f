// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages for gateway-server communication.
//!
//! The protocol is strict request/response:
//! - Client sends a [`Request`] carrying a client-chosen id
//! - Server answers with exactly one [`Reply`] echoing that id

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{EntityKind, Membership, Record};

/// Reply id used when the request itself could not be parsed. Clients
/// never assign it.
pub const UNCORRELATED_ID: u64 = 0;

/// A request from the gateway to the remote store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    /// Correlation id echoed in the reply. Never [`UNCORRELATED_ID`].
    pub id: u64,
    #[serde(flatten)]
    pub body: RequestBody,
}

/// The operation requested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestBody {
    /// Every entity of `kind` owned by `owner_id`.
    FetchAll { kind: EntityKind, owner_id: String },

    /// Insert a new entity. Fails with `duplicate` if the id exists.
    Create { owner_id: String, record: Record },

    /// Overwrite an existing entity. Fails with `not_found` if absent.
    Update { record: Record },

    /// Delete an entity and its join rows. Fails with `not_found` if absent.
    ///
    /// `target`, not `id`: the envelope's correlation id shares the object.
    Delete { kind: EntityKind, target: Uuid },

    /// Insert a join row. Fails with `duplicate` if present.
    AddMembership { membership: Membership },

    /// Delete a join row. Fails with `not_found` if absent.
    RemoveMembership { membership: Membership },

    /// Member person ids for each requested group.
    FetchMemberships { group_ids: Vec<Uuid> },

    /// Keepalive and reachability probe.
    Ping,
}

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Duplicate,
    /// The payload is invalid; resubmitting it unchanged fails again.
    Rejected,
    Internal,
}

/// A reply from the remote store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reply {
    /// Id of the request being answered.
    pub id: u64,
    #[serde(flatten)]
    pub body: ReplyBody,
}

/// The result of a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyBody {
    Records { records: Vec<Record> },
    Record { record: Record },
    Memberships { memberships: BTreeMap<Uuid, Vec<Uuid>> },
    Done,
    Pong,
    Error { code: ErrorCode, message: String },
}

impl Request {
    pub fn new(id: u64, body: RequestBody) -> Self {
        Request { id, body }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl Reply {
    pub fn new(id: u64, body: ReplyBody) -> Self {
        Reply { id, body }
    }

    /// Creates an Error reply.
    pub fn error(id: u64, code: ErrorCode, message: impl Into<String>) -> Self {
        Reply {
            id,
            body: ReplyBody::Error {
                code,
                message: message.into(),
            },
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
