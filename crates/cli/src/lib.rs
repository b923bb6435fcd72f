// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! rollcall - an offline-first roster of people and groups.
//!
//! Every mutation commits to the device first. Changes to entities with
//! canonical ids are then written through to the remote store, or queued in
//! the pending log when that is not possible, and replayed in order on the
//! next reconciliation pass.
//!
//! # Main Components
//!
//! - [`SyncOrchestrator`] - mutation API, write-through, replay and pull-merge
//! - [`PendingLog`] - durable FIFO of unconfirmed changes
//! - [`RemoteGateway`] - CRUD against the remote store ([`WsGateway`] over WebSocket)
//! - [`ConnectivitySignal`] - online flag and reconnect detection
//! - [`Config`] - data directory layout and settings
//!
//! ```rust,ignore
//! use rollcall::{ConnectivitySignal, PendingLog, SyncOptions, SyncOrchestrator, WsGateway};
//!
//! let sync = SyncOrchestrator::new(
//!     "coach@example.org",
//!     WsGateway::new(Default::default()),
//!     rc_core::LocalStore::open(&db_path)?,
//!     PendingLog::open(&log_path)?,
//!     ConnectivitySignal::new(true),
//!     SyncOptions::default(),
//! );
//! let outcome = sync.save_person(person).await?;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod connectivity;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod queue;
pub mod reconcile;
pub mod scheduler;

#[cfg(test)]
mod test_helpers;

pub use cli::{
    Cli, Command, GroupCommand, GroupFields, MemberCommand, OutputFormat, PersonCommand,
    PersonFields,
};
pub use config::{init_data_dir, resolve_data_dir, Config};
pub use connectivity::{ConnectivitySignal, ReconnectWatch};
pub use error::{Error, Result};
pub use gateway::{GatewayConfig, RemoteError, RemoteGateway, WsGateway};
pub use orchestrator::{
    MutationOutcome, QueueReason, ReconcileOutcome, ReconcileReport, ReplayReport, SyncOptions,
    SyncOrchestrator,
};
pub use queue::PendingLog;

use commands::Session;

/// Execute a CLI command.
pub async fn run(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir.as_deref();
    if let Command::Init { owner, url } = cli.command {
        return commands::init::run(data_dir, &owner, url);
    }

    let session = Session::open(data_dir).await?;
    let result = dispatch(&session, cli.command).await;
    session.close().await;
    result
}

async fn dispatch(session: &Session, command: Command) -> Result<()> {
    match command {
        Command::Init { .. } => Err(Error::AlreadyInitialized(
            session.data_dir.display().to_string(),
        )),
        Command::Person(cmd) => match cmd {
            PersonCommand::Add {
                name,
                fields,
                local,
            } => commands::person::add(session, &name, fields, local).await,
            PersonCommand::Edit { id, name, fields } => {
                commands::person::edit(session, &id, name, fields).await
            }
            PersonCommand::Rm { id } => commands::person::remove(session, &id).await,
            PersonCommand::List { output } => commands::person::list(session, output).await,
        },
        Command::Group(cmd) => match cmd {
            GroupCommand::Add {
                name,
                fields,
                local,
            } => commands::group::add(session, &name, fields, local).await,
            GroupCommand::Edit { id, name, fields } => {
                commands::group::edit(session, &id, name, fields).await
            }
            GroupCommand::Rm { id } => commands::group::remove(session, &id).await,
            GroupCommand::List { output } => commands::group::list(session, output).await,
        },
        Command::Member(cmd) => match cmd {
            MemberCommand::Add { group, person } => {
                commands::member::add(session, &group, &person).await
            }
            MemberCommand::Rm { group, person } => {
                commands::member::remove(session, &group, &person).await
            }
        },
        Command::Sync => commands::sync::sync(session).await,
        Command::Status => commands::sync::status(session).await,
        Command::Watch => commands::sync::watch(session).await,
    }
}
