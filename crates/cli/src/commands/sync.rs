// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync, status and watch commands.

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::Session;
use crate::connectivity::probe_loop;
use crate::error::Result;
use crate::orchestrator::{ReconcileOutcome, ReconcileReport};

/// Runs one reconciliation pass and prints what it did.
pub async fn sync(session: &Session) -> Result<()> {
    match session.sync.reconcile().await? {
        ReconcileOutcome::Completed(report) => {
            for line in format_report(&report) {
                println!("{}", line);
            }
        }
        ReconcileOutcome::Coalesced => println!("A sync is already running."),
    }
    Ok(())
}

pub(crate) fn format_report(report: &ReconcileReport) -> Vec<String> {
    let replay = &report.replay;
    let mut lines = vec![format!(
        "Pushed {} change(s), {} still pending",
        replay.replayed, replay.remaining
    )];
    if let Some(reason) = &replay.halted {
        lines.push(format!("  stopped early: {}", reason));
    }
    for (change, reason) in &replay.rejected {
        lines.push(format!("  rejected {}: {}", change, reason));
    }
    lines.push(format!(
        "Pulled {} people, {} groups ({} kept for pending changes)",
        report.people.adopted,
        report.groups.adopted,
        report.people.shielded + report.groups.shielded
    ));
    lines
}

pub async fn status(session: &Session) -> Result<()> {
    let sync = &session.sync;
    let online = sync.connectivity().is_online();
    let pending = sync.pending_changes().await;

    println!("Owner: {}", sync.owner_id());
    println!(
        "Remote: {} ({})",
        session.config.remote.url,
        if online { "online" } else { "offline" }
    );
    match sync.last_sync().await {
        Some(at) => println!("Last sync: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Last sync: never"),
    }
    println!(
        "Cached: {} people, {} groups",
        sync.people().await.len(),
        sync.groups().await.len()
    );
    println!("Pending changes: {}", pending.len());
    for change in &pending {
        println!("  {}", change);
    }
    Ok(())
}

/// Keeps probing the remote and syncs on every reconnect until Ctrl-C.
pub async fn watch(session: &Session) -> Result<()> {
    let cancel = CancellationToken::new();
    let sync = session.sync.clone();

    let probe = tokio::spawn(probe_loop(
        sync.connectivity().clone(),
        session.config.probe_interval(),
        cancel.clone(),
        {
            let sync = sync.clone();
            move || {
                let sync = sync.clone();
                async move { sync.gateway().ping().await.is_ok() }
            }
        },
    ));
    let watcher = sync.spawn_watcher();

    if sync.connectivity().is_online() {
        if let Err(e) = self::sync(session).await {
            eprintln!("warning: initial sync failed: {}", e);
        }
    }
    println!("Watching {} (Ctrl-C to stop)", session.config.remote.url);

    tokio::signal::ctrl_c().await?;
    info!("stopping watch");
    cancel.cancel();
    sync.shutdown();
    let _ = tokio::join!(probe, watcher);
    Ok(())
}
