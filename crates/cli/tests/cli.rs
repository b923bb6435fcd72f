// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Binary tests for `rollcall` against an unreachable remote.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use similar_asserts::assert_eq;
use tempfile::TempDir;

/// An initialized data directory whose remote never answers.
struct Roster {
    temp: TempDir,
}

impl Roster {
    fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        rollcall(temp.path())
            .args(["init", "coach@example.org", "--url", "ws://127.0.0.1:9"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Owner: coach@example.org"));
        Roster { temp }
    }

    fn cmd(&self) -> Command {
        rollcall(self.temp.path())
    }

    fn stdout(&self, args: &[&str]) -> String {
        let output = self.cmd().args(args).output().unwrap();
        assert!(output.status.success(), "{:?} failed: {:?}", args, output);
        String::from_utf8_lossy(&output.stdout).to_string()
    }
}

fn rollcall(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("rollcall");
    cmd.env("ROLLCALL_DIR", dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn commands_before_init_fail() {
    let temp = TempDir::new().unwrap();
    rollcall(temp.path())
        .args(["person", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("run 'rollcall init' first"));
}

#[test]
fn init_twice_fails() {
    let roster = Roster::new();
    roster
        .cmd()
        .args(["init", "someone-else"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn offline_add_is_queued() {
    let roster = Roster::new();
    roster
        .cmd()
        .args(["person", "add", "Ana Lima", "--email", "ana@example.org"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ana Lima (queued: offline)"));

    let status = roster.stdout(&["status"]);
    assert!(status.contains("(offline)"));
    assert!(status.contains("Pending changes: 1"));
    assert!(status.contains("Last sync: never"));
}

#[test]
fn local_person_is_never_queued() {
    let roster = Roster::new();
    roster
        .cmd()
        .args(["person", "add", "Scratch", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(local only)"));

    assert!(roster.stdout(&["status"]).contains("Pending changes: 0"));
}

#[test]
fn list_json_is_sorted_by_name() {
    let roster = Roster::new();
    for name in ["bo", "Ana", "Cy"] {
        roster.cmd().args(["person", "add", name]).assert().success();
    }

    let json = roster.stdout(&["person", "list", "-o", "json"]);
    let people: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    let names: Vec<&str> = people.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Ana", "bo", "Cy"]);
}

#[test]
fn membership_shows_in_group_list() {
    let roster = Roster::new();
    roster.cmd().args(["person", "add", "Ana"]).assert().success();
    roster.cmd().args(["group", "add", "Choir"]).assert().success();

    let person: Vec<serde_json::Value> =
        serde_json::from_str(&roster.stdout(&["person", "list", "-o", "json"])).unwrap();
    let group: Vec<serde_json::Value> =
        serde_json::from_str(&roster.stdout(&["group", "list", "-o", "json"])).unwrap();
    let person_id = person[0]["id"].as_str().unwrap();
    let group_id = group[0]["id"].as_str().unwrap();

    roster
        .cmd()
        .args(["member", "add", group_id, person_id])
        .assert()
        .success();

    assert!(roster.stdout(&["group", "list"]).contains("Choir  (1 member)"));
    assert!(roster.stdout(&["status"]).contains("Pending changes: 3"));
}

#[test]
fn sync_offline_fails_and_keeps_queue() {
    let roster = Roster::new();
    roster.cmd().args(["group", "add", "Choir"]).assert().success();

    roster
        .cmd()
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("remote unreachable"));
    assert!(roster.stdout(&["status"]).contains("Pending changes: 1"));
}

#[test]
fn unknown_person_is_reported() {
    let roster = Roster::new();
    roster
        .cmd()
        .args(["person", "rm", "nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("person not found: nobody"));
}
