// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL (JSON Lines) file utilities.
//!
//! Each record is one JSON line. Appends are fsynced; full rewrites go
//! through a temporary file and a rename so a crash never leaves a
//! half-written log behind.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Records read from a JSONL file, plus the lines that could not be parsed.
#[derive(Debug)]
pub struct LossyRead<T> {
    pub records: Vec<T>,
    /// 1-based line numbers of unparseable lines.
    pub skipped: Vec<usize>,
}

/// Appends a record to a JSONL file with fsync for durability.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let json = serde_json::to_string(record)?;
    writeln!(file, "{json}")?;
    file.sync_all()?;

    Ok(())
}

/// Reads every parseable record from a JSONL file.
///
/// Blank lines are ignored, lines that fail to parse are reported in
/// [`LossyRead::skipped`], and a missing file reads as empty. Only I/O
/// errors are returned as errors.
pub fn read_lossy<T: DeserializeOwned>(path: &Path) -> Result<LossyRead<T>> {
    let mut out = LossyRead {
        records: Vec::new(),
        skipped: Vec::new(),
    };

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(e.into()),
    };

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => out.records.push(record),
            Err(_) => out.skipped.push(index + 1),
        }
    }

    Ok(out)
}

/// Writes all records to a JSONL file, replacing existing content.
pub fn write_all<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let tmp = path.with_extension("jsonl.tmp");
    {
        let mut file = File::create(&tmp)?;
        for record in records {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{json}")?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    Ok(())
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
