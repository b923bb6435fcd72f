// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Entity identifiers.
//!
//! An identifier is classified exactly once, when it is created or parsed:
//! text in the standard 36-character hyphenated UUID form is
//! [`EntityId::Canonical`] and may be replicated to the remote store, anything
//! else is [`EntityId::Local`] and never leaves the device.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of the hyphenated UUID text form.
const CANONICAL_LEN: usize = 36;
/// Byte offsets of the hyphens in the hyphenated UUID text form.
const HYPHENS: [usize; 4] = [8, 13, 18, 23];
/// Prefix used for generated local-only identifiers.
const LOCAL_PREFIX: &str = "local-";

/// Identifier of a person or group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityId {
    /// Remote-eligible identifier in canonical UUID form.
    Canonical(Uuid),
    /// Device-local identifier, permanently excluded from replication.
    Local(String),
}

impl EntityId {
    /// Generates a fresh remote-eligible identifier.
    pub fn generate() -> Self {
        EntityId::Canonical(Uuid::new_v4())
    }

    /// Generates a fresh local-only identifier.
    ///
    /// Uses the un-hyphenated UUID form so the result can never be mistaken
    /// for a canonical id.
    pub fn local() -> Self {
        EntityId::Local(format!("{LOCAL_PREFIX}{}", Uuid::new_v4().simple()))
    }

    /// Classifies arbitrary identifier text.
    pub fn parse(s: &str) -> Self {
        if is_canonical(s) {
            if let Ok(uuid) = Uuid::try_parse(s) {
                return EntityId::Canonical(uuid);
            }
        }
        EntityId::Local(s.to_string())
    }

    /// Returns the UUID if this identifier may be sent to the remote store.
    pub fn remote(&self) -> Option<Uuid> {
        match self {
            EntityId::Canonical(uuid) => Some(*uuid),
            EntityId::Local(_) => None,
        }
    }

    /// Returns true if this identifier is eligible for remote replication.
    pub fn is_remote_eligible(&self) -> bool {
        matches!(self, EntityId::Canonical(_))
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        EntityId::Canonical(uuid)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        if is_canonical(&s) {
            if let Ok(uuid) = Uuid::try_parse(&s) {
                return EntityId::Canonical(uuid);
            }
        }
        EntityId::Local(s)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        match id {
            EntityId::Canonical(uuid) => uuid.hyphenated().to_string(),
            EntityId::Local(s) => s,
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EntityId::parse(s))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Canonical(uuid) => write!(f, "{}", uuid.hyphenated()),
            EntityId::Local(s) => write!(f, "{s}"),
        }
    }
}

/// Returns true if `s` has the shape `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
///
/// `Uuid::try_parse` alone also accepts the simple, braced and URN forms,
/// none of which are remote-eligible.
pub fn is_canonical(s: &str) -> bool {
    if s.len() != CANONICAL_LEN {
        return false;
    }
    s.bytes().enumerate().all(|(i, b)| {
        if HYPHENS.contains(&i) {
            b == b'-'
        } else {
            b.is_ascii_hexdigit()
        }
    })
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
