// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod group;
pub mod init;
pub mod member;
pub mod person;
pub mod sync;

use std::path::{Path, PathBuf};

use rc_core::{EntityId, LocalStore};
use tracing::debug;

use crate::config::{cache_db_path, pending_log_path, resolve_data_dir, Config};
use crate::connectivity::ConnectivitySignal;
use crate::error::Result;
use crate::gateway::WsGateway;
use crate::orchestrator::{MutationOutcome, QueueReason, SyncOrchestrator};
use crate::queue::PendingLog;

/// An opened data directory with a running sync engine.
pub struct Session {
    pub data_dir: PathBuf,
    pub config: Config,
    pub sync: SyncOrchestrator<WsGateway>,
}

impl Session {
    /// Opens the data directory and probes the remote once, so the
    /// connectivity signal starts out accurate.
    pub async fn open(data_dir: Option<&Path>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir)?;
        let config = Config::load(&data_dir)?;
        let store = LocalStore::open(&cache_db_path(&data_dir))?;
        let log = PendingLog::open(&pending_log_path(&data_dir))?;

        let gateway = WsGateway::new(config.gateway_config());
        let online = match gateway.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!("remote {} unreachable: {}", gateway.url(), e);
                false
            }
        };

        let sync = SyncOrchestrator::new(
            config.owner_id.clone(),
            gateway,
            store,
            log,
            ConnectivitySignal::new(online),
            config.sync_options(),
        );
        Ok(Session {
            data_dir,
            config,
            sync,
        })
    }

    /// Stops background work and closes the remote connection.
    pub async fn close(self) {
        self.sync.shutdown();
        self.sync.gateway().close().await;
    }
}

/// Parses a user-supplied id. Anything that is not a UUID is local-only.
pub fn parse_id(s: &str) -> EntityId {
    EntityId::parse(s.trim())
}

/// One-line suffix describing where a mutation ended up.
pub fn describe_outcome(outcome: &MutationOutcome) -> String {
    match outcome {
        MutationOutcome::LocalOnly => "local only".to_string(),
        MutationOutcome::Confirmed => "synced".to_string(),
        MutationOutcome::Queued(QueueReason::Offline) => "queued: offline".to_string(),
        MutationOutcome::Queued(QueueReason::Behind) => {
            "queued behind earlier changes".to_string()
        }
        MutationOutcome::Queued(QueueReason::Transient(reason)) => format!("queued: {}", reason),
        MutationOutcome::Rejected(reason) => format!("saved locally, rejected by remote: {}", reason),
    }
}

/// Prints a mutation result, and a warning to stderr if the remote refused it.
pub fn print_outcome(action: &str, outcome: &MutationOutcome) {
    println!("{} ({})", action, describe_outcome(outcome));
    if let MutationOutcome::Rejected(_) = outcome {
        eprintln!("warning: this change will not be retried");
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
