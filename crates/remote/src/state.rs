// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state management.
//!
//! Wraps the remote database for shared access across connections.

use std::path::Path;
use std::sync::Arc;

use rc_core::protocol::{ReplyBody, RequestBody};
use tokio::sync::Mutex;
use tracing::debug;

use crate::db::{RemoteDb, StoreResult};

/// Shared server state containing the remote database.
#[derive(Clone)]
pub struct ServerState {
    db: Arc<Mutex<RemoteDb>>,
}

impl ServerState {
    /// Opens the database in the given directory.
    pub fn new(data_dir: &Path) -> StoreResult<Self> {
        let db = RemoteDb::open(&data_dir.join("remote.db"))?;
        Ok(Self::with_db(db))
    }

    pub fn with_db(db: RemoteDb) -> Self {
        ServerState {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Executes one request and returns the reply body.
    ///
    /// Store failures become `Error` replies; this never fails itself.
    pub async fn execute(&self, body: RequestBody) -> ReplyBody {
        let mut db = self.db.lock().await;
        let result = match body {
            RequestBody::FetchAll { kind, owner_id } => db
                .fetch_all(kind, &owner_id)
                .map(|records| ReplyBody::Records { records }),
            RequestBody::Create { owner_id, record } => db
                .create(&owner_id, record)
                .map(|record| ReplyBody::Record { record }),
            RequestBody::Update { record } => {
                db.update(record).map(|record| ReplyBody::Record { record })
            }
            RequestBody::Delete { kind, target } => db.delete(kind, target).map(|()| ReplyBody::Done),
            RequestBody::AddMembership { membership } => {
                db.add_membership(&membership).map(|()| ReplyBody::Done)
            }
            RequestBody::RemoveMembership { membership } => {
                db.remove_membership(&membership).map(|()| ReplyBody::Done)
            }
            RequestBody::FetchMemberships { group_ids } => db
                .fetch_memberships(&group_ids)
                .map(|memberships| ReplyBody::Memberships { memberships }),
            RequestBody::Ping => Ok(ReplyBody::Pong),
        };

        result.unwrap_or_else(|e| {
            debug!("request failed: {}", e);
            ReplyBody::Error {
                code: e.code(),
                message: e.to_string(),
            }
        })
    }
}
