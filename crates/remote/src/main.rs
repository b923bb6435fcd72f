// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! rc-remote: WebSocket remote store for rollcall clients.
//!
//! Holds the authoritative people, groups and membership join table, and
//! answers stateless CRUD requests. It keeps no per-client state.

mod db;
mod server;
#[cfg(test)]
mod server_tests;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// rc-remote: rollcall remote store
#[derive(Parser, Debug)]
#[command(name = "rc-remote")]
#[command(about = "WebSocket remote store for rollcall clients")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Directory for database storage
    #[arg(short, long, default_value = ".")]
    data: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // RUST_LOG wins over --verbose when set.
    let default_filter = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(bind = %args.bind, data = %args.data.display(), "starting rc-remote");

    let state = state::ServerState::new(&args.data)?;
    server::run(args.bind, state).await?;

    Ok(())
}
