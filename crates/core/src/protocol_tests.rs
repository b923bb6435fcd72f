// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::id::EntityId;
use crate::model::{Group, Person};
use chrono::Utc;
use yare::parameterized;

fn test_person() -> Record {
    Record::Person(Person::new(EntityId::generate(), "Alice", Utc::now()))
}

fn test_membership() -> Membership {
    Membership::new(EntityId::generate(), EntityId::generate())
}

#[parameterized(
    fetch_all = { RequestBody::FetchAll { kind: EntityKind::Group, owner_id: "owner-a".into() } },
    create = { RequestBody::Create { owner_id: "owner-a".into(), record: test_person() } },
    update = { RequestBody::Update { record: test_person() } },
    delete = { RequestBody::Delete { kind: EntityKind::Person, target: Uuid::new_v4() } },
    add_membership = { RequestBody::AddMembership { membership: test_membership() } },
    remove_membership = { RequestBody::RemoveMembership { membership: test_membership() } },
    fetch_memberships = { RequestBody::FetchMemberships { group_ids: vec![Uuid::new_v4()] } },
    ping = { RequestBody::Ping },
)]
fn request_roundtrip(body: RequestBody) {
    let msg = Request::new(7, body);
    let json = msg.to_json().unwrap();
    let parsed = Request::from_json(&json).unwrap();
    assert_eq!(msg, parsed);
}

#[test]
fn delete_keeps_correlation_id_and_target_apart() {
    let target = Uuid::new_v4();
    let json = Request::new(7, RequestBody::Delete { kind: EntityKind::Group, target })
        .to_json()
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["id"], 7);
    assert_eq!(value["target"], target.to_string());
    assert_eq!(Request::from_json(&json).unwrap().id, 7);
}

#[test]
fn memberships_reply_roundtrip() {
    let mut memberships = BTreeMap::new();
    memberships.insert(Uuid::new_v4(), vec![Uuid::new_v4(), Uuid::new_v4()]);
    memberships.insert(Uuid::new_v4(), Vec::new());

    let msg = Reply::new(3, ReplyBody::Memberships { memberships });
    let json = msg.to_json().unwrap();
    assert_eq!(Reply::from_json(&json).unwrap(), msg);
}

#[test]
fn records_reply_roundtrip() {
    let group = Group::new(EntityId::generate(), "Choir", Utc::now());
    let msg = Reply::new(
        4,
        ReplyBody::Records {
            records: vec![test_person(), Record::Group(group)],
        },
    );
    let json = msg.to_json().unwrap();
    assert_eq!(Reply::from_json(&json).unwrap(), msg);
}

#[parameterized(
    done = { Reply::new(1, ReplyBody::Done) },
    pong = { Reply::new(2, ReplyBody::Pong) },
    error = { Reply::error(3, ErrorCode::NotFound, "no such person") },
)]
fn simple_reply_roundtrip(msg: Reply) {
    let json = msg.to_json().unwrap();
    assert_eq!(Reply::from_json(&json).unwrap(), msg);
}

#[test]
fn message_json_format() {
    let json = Request::new(9, RequestBody::Ping).to_json().unwrap();
    assert!(json.contains("\"id\":9"));
    assert!(json.contains("\"type\":\"ping\""));

    let json = Reply::error(9, ErrorCode::Duplicate, "exists")
        .to_json()
        .unwrap();
    assert!(json.contains("\"type\":\"error\""));
    assert!(json.contains("\"code\":\"duplicate\""));
    assert!(json.contains("\"message\":\"exists\""));
}
