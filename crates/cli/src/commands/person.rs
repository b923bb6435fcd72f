// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Utc;
use rc_core::{EntityId, Person};

use super::{parse_id, print_outcome, Session};
use crate::cli::{OutputFormat, PersonFields};
use crate::error::{Error, Result};

/// Applies command-line fields; repeatable fields replace only when given.
fn apply_fields(person: &mut Person, fields: PersonFields) {
    if let Some(email) = fields.email {
        person.email = Some(email).filter(|e| !e.is_empty());
    }
    if let Some(phone) = fields.phone {
        person.phone = Some(phone).filter(|p| !p.is_empty());
    }
    if !fields.allergies.is_empty() {
        person.allergies = fields.allergies;
    }
    if !fields.photos.is_empty() {
        person.photos = fields.photos;
    }
}

pub async fn add(session: &Session, name: &str, fields: PersonFields, local: bool) -> Result<()> {
    let id = if local {
        EntityId::local()
    } else {
        EntityId::generate()
    };
    let mut person = Person::new(id, name.trim(), Utc::now());
    apply_fields(&mut person, fields);

    let outcome = session.sync.save_person(person.clone()).await?;
    print_outcome(&format!("Added {} {}", person.id, person.name), &outcome);
    Ok(())
}

pub async fn edit(
    session: &Session,
    id: &str,
    name: Option<String>,
    fields: PersonFields,
) -> Result<()> {
    let id = parse_id(id);
    let mut person = session
        .sync
        .person(&id)
        .await
        .ok_or_else(|| Error::PersonNotFound(id.to_string()))?;
    if let Some(name) = name {
        person.name = name.trim().to_string();
    }
    apply_fields(&mut person, fields);

    let outcome = session.sync.save_person(person.clone()).await?;
    print_outcome(&format!("Updated {} {}", person.id, person.name), &outcome);
    Ok(())
}

pub async fn remove(session: &Session, id: &str) -> Result<()> {
    let id = parse_id(id);
    let outcome = session.sync.delete_person(&id).await?;
    print_outcome(&format!("Deleted {}", id), &outcome);
    Ok(())
}

pub async fn list(session: &Session, output: OutputFormat) -> Result<()> {
    let mut people = session.sync.people().await;
    people.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&people)?),
        OutputFormat::Text => {
            if people.is_empty() {
                println!("No people yet.");
            }
            for person in &people {
                println!("{}", format_person_line(person));
            }
        }
    }
    Ok(())
}

pub(crate) fn format_person_line(person: &Person) -> String {
    let mut line = format!("{}  {}", person.id, person.name);
    if let Some(email) = &person.email {
        line.push_str(&format!("  <{}>", email));
    }
    if !person.allergies.is_empty() {
        line.push_str(&format!("  allergies: {}", person.allergies.join(", ")));
    }
    if !person.groups.is_empty() {
        line.push_str(&format!("  groups: {}", person.groups.len()));
    }
    line
}
