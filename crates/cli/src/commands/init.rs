// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use rc_core::LocalStore;

use crate::config::{cache_db_path, init_data_dir, pending_log_path, resolve_data_dir, Config};
use crate::error::Result;
use crate::queue::PendingLog;

pub fn run(data_dir: Option<&Path>, owner: &str, url: Option<String>) -> Result<()> {
    let data_dir = resolve_data_dir(data_dir)?;
    let mut config = Config::new(owner.trim())?;
    if let Some(url) = url {
        config.remote.url = url;
    }
    init_data_dir(&data_dir, &config)?;

    // Fail here rather than on first use if the directory is unusable.
    LocalStore::open(&cache_db_path(&data_dir))?;
    PendingLog::open(&pending_log_path(&data_dir))?;

    println!("Initialized rollcall at {}", data_dir.display());
    println!("Owner: {}", config.owner_id);
    println!("Remote: {}", config.remote.url);
    Ok(())
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
