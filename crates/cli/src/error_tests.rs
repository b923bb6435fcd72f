// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[test]
fn not_initialized_names_init_command() {
    let err = Error::NotInitialized;
    assert!(err.to_string().contains("rollcall init"));
}

#[test]
fn core_errors_pass_through() {
    let err: Error = rc_core::Error::InvalidInput("bad".into()).into();
    assert_eq!(err.to_string(), "bad");
}

#[parameterized(
    not_found = { RemoteError::NotFound, "not found on remote" },
    rejected = { RemoteError::Rejected("empty name".into()), "rejected by remote: empty name" },
    transient = { RemoteError::Transient("timeout".into()), "remote unavailable: timeout" },
)]
fn remote_error_conversion(remote: RemoteError, expected: &str) {
    let err: Error = remote.into();
    assert_eq!(err.to_string(), expected);
}

#[test]
fn connectivity_error_has_hint() {
    let msg = Error::ConnectivityUnavailable.to_string();
    assert!(msg.contains("remote unreachable"));
    assert!(msg.contains("hint:"));
}
