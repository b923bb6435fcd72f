// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::gateway::RemoteError;
use crate::queue::QueueError;

/// All possible errors that can occur in the rollcall library.
///
/// Remote failures never surface from mutations (those report a
/// [`MutationOutcome`](crate::orchestrator::MutationOutcome)); they appear
/// here only from explicit sync requests.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'rollcall init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("person not found: {0}")]
    PersonNotFound(String),

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("remote unreachable\n  hint: changes stay queued until the next sync")]
    ConnectivityUnavailable,

    #[error("not found on remote")]
    RemoteNotFound,

    #[error("remote unavailable: {0}")]
    RemoteTransient(String),

    #[error("rejected by remote: {0}")]
    ValidationRejected(String),

    #[error("sync engine is shut down")]
    Shutdown,

    #[error(transparent)]
    Core(#[from] rc_core::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound => Error::RemoteNotFound,
            RemoteError::Duplicate => Error::RemoteTransient("unexpected duplicate".into()),
            RemoteError::Rejected(reason) => Error::ValidationRejected(reason),
            RemoteError::Transient(reason) => Error::RemoteTransient(reason),
        }
    }
}

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
