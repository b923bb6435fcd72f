// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Utc;
use rc_core::{EntityId, Group};

use super::{parse_id, print_outcome, Session};
use crate::cli::{GroupFields, OutputFormat};
use crate::error::{Error, Result};

fn apply_fields(group: &mut Group, fields: GroupFields) {
    if let Some(description) = fields.description {
        group.description = Some(description).filter(|d| !d.is_empty());
    }
    if let Some(guide) = fields.guide {
        group.guide_id = Some(guide).filter(|g| !g.is_empty());
    }
    if let Some(notes) = fields.notes {
        group.notes = Some(notes).filter(|n| !n.is_empty());
    }
}

pub async fn add(session: &Session, name: &str, fields: GroupFields, local: bool) -> Result<()> {
    let id = if local {
        EntityId::local()
    } else {
        EntityId::generate()
    };
    let mut group = Group::new(id, name.trim(), Utc::now());
    apply_fields(&mut group, fields);

    let outcome = session.sync.save_group(group.clone()).await?;
    print_outcome(&format!("Added {} {}", group.id, group.name), &outcome);
    Ok(())
}

pub async fn edit(
    session: &Session,
    id: &str,
    name: Option<String>,
    fields: GroupFields,
) -> Result<()> {
    let id = parse_id(id);
    let mut group = session
        .sync
        .group(&id)
        .await
        .ok_or_else(|| Error::GroupNotFound(id.to_string()))?;
    if let Some(name) = name {
        group.name = name.trim().to_string();
    }
    apply_fields(&mut group, fields);

    let outcome = session.sync.save_group(group.clone()).await?;
    print_outcome(&format!("Updated {} {}", group.id, group.name), &outcome);
    Ok(())
}

pub async fn remove(session: &Session, id: &str) -> Result<()> {
    let id = parse_id(id);
    let outcome = session.sync.delete_group(&id).await?;
    print_outcome(&format!("Deleted {}", id), &outcome);
    Ok(())
}

pub async fn list(session: &Session, output: OutputFormat) -> Result<()> {
    let mut groups = session.sync.groups().await;
    groups.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&groups)?),
        OutputFormat::Text => {
            if groups.is_empty() {
                println!("No groups yet.");
            }
            for group in &groups {
                let noun = if group.member_count == 1 { "member" } else { "members" };
                println!("{}  {}  ({} {})", group.id, group.name, group.member_count, noun);
            }
        }
    }
    Ok(())
}
