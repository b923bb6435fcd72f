// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::{parse_id, print_outcome, Session};
use crate::error::Result;

pub async fn add(session: &Session, group: &str, person: &str) -> Result<()> {
    let (group_id, person_id) = (parse_id(group), parse_id(person));
    let outcome = session.sync.add_member(&group_id, &person_id).await?;
    print_outcome(&format!("Added {} to {}", person_id, group_id), &outcome);
    Ok(())
}

pub async fn remove(session: &Session, group: &str, person: &str) -> Result<()> {
    let (group_id, person_id) = (parse_id(group), parse_id(person));
    let outcome = session.sync.remove_member(&group_id, &person_id).await?;
    print_outcome(&format!("Removed {} from {}", person_id, group_id), &outcome);
    Ok(())
}
