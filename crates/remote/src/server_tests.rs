// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test server utilities and request-handling tests.

#![cfg(test)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use rc_core::protocol::{ErrorCode, Reply, ReplyBody, Request, RequestBody, UNCORRELATED_ID};
use rc_core::{EntityId, EntityKind, Group, Membership, Person, Record};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::db::RemoteDb;
use crate::server;
use crate::state::ServerState;

/// A server on a random port backed by an in-memory database.
pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let state = ServerState::with_db(RemoteDb::open_in_memory().unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::select! {
                result = server::serve(listener, state) => {
                    if let Err(e) = result {
                        eprintln!("Test server error: {}", e);
                    }
                }
                _ = shutdown_rx => {}
            }
        });

        TestServer { addr, shutdown_tx }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

type Client = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect(server: &TestServer) -> Client {
    let (ws, _) = connect_async(server.ws_url()).await.unwrap();
    ws
}

async fn send_text(ws: &mut Client, text: String) -> Reply {
    ws.send(Message::Text(text.into())).await.unwrap();
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Reply::from_json(&text).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("expected a reply, got {:?}", other),
        }
    }
}

async fn call(ws: &mut Client, id: u64, body: RequestBody) -> ReplyBody {
    let reply = send_text(ws, Request::new(id, body).to_json().unwrap()).await;
    assert_eq!(reply.id, id);
    reply.body
}

fn error_code(body: ReplyBody) -> ErrorCode {
    match body {
        ReplyBody::Error { code, .. } => code,
        other => panic!("expected an error, got {:?}", other),
    }
}

#[tokio::test]
async fn ping_echoes_id() {
    let server = TestServer::start().await;
    let mut ws = connect(&server).await;

    assert_eq!(call(&mut ws, 42, RequestBody::Ping).await, ReplyBody::Pong);
    server.shutdown();
}

#[tokio::test]
async fn create_then_fetch_all() {
    let server = TestServer::start().await;
    let mut ws = connect(&server).await;
    let ana = Person::new(EntityId::generate(), "Ana", Utc::now());

    let created = call(
        &mut ws,
        1,
        RequestBody::Create {
            owner_id: "coach".into(),
            record: Record::Person(ana.clone()),
        },
    )
    .await;
    assert_eq!(created, ReplyBody::Record { record: Record::Person(ana.clone()) });

    let fetched = call(
        &mut ws,
        2,
        RequestBody::FetchAll {
            kind: EntityKind::Person,
            owner_id: "coach".into(),
        },
    )
    .await;
    assert_eq!(fetched, ReplyBody::Records { records: vec![Record::Person(ana)] });
}

#[tokio::test]
async fn store_errors_map_to_codes() {
    let server = TestServer::start().await;
    let mut ws = connect(&server).await;
    let choir = Group::new(EntityId::generate(), "Choir", Utc::now());
    let create = RequestBody::Create {
        owner_id: "coach".into(),
        record: Record::Group(choir.clone()),
    };

    call(&mut ws, 1, create.clone()).await;
    assert_eq!(error_code(call(&mut ws, 2, create).await), ErrorCode::Duplicate);

    let ghost = Group::new(EntityId::generate(), "Ghost", Utc::now());
    let update = RequestBody::Update {
        record: Record::Group(ghost),
    };
    assert_eq!(error_code(call(&mut ws, 3, update).await), ErrorCode::NotFound);

    let add = RequestBody::AddMembership {
        membership: Membership::new(choir.id.clone(), EntityId::generate()),
    };
    assert_eq!(error_code(call(&mut ws, 4, add).await), ErrorCode::Rejected);
}

#[tokio::test]
async fn membership_round_trip_over_socket() {
    let server = TestServer::start().await;
    let mut ws = connect(&server).await;
    let ana = Person::new(EntityId::generate(), "Ana", Utc::now());
    let choir = Group::new(EntityId::generate(), "Choir", Utc::now());
    for (id, record) in [(1, Record::Person(ana.clone())), (2, Record::Group(choir.clone()))] {
        let body = RequestBody::Create {
            owner_id: "coach".into(),
            record,
        };
        call(&mut ws, id, body).await;
    }

    let membership = Membership::new(choir.id.clone(), ana.id.clone());
    let added = call(&mut ws, 3, RequestBody::AddMembership { membership }).await;
    assert_eq!(added, ReplyBody::Done);

    let group_id = choir.id.remote().unwrap();
    let joins = call(
        &mut ws,
        4,
        RequestBody::FetchMemberships {
            group_ids: vec![group_id],
        },
    )
    .await;
    let ReplyBody::Memberships { memberships } = joins else {
        panic!("expected memberships");
    };
    assert_eq!(memberships[&group_id], vec![ana.id.remote().unwrap()]);
}

#[tokio::test]
async fn delete_over_socket_cascades_and_echoes_id() {
    let server = TestServer::start().await;
    let mut ws = connect(&server).await;
    let ana = Person::new(EntityId::generate(), "Ana", Utc::now());
    let choir = Group::new(EntityId::generate(), "Choir", Utc::now());
    for (id, record) in [(1, Record::Person(ana.clone())), (2, Record::Group(choir.clone()))] {
        let body = RequestBody::Create {
            owner_id: "coach".into(),
            record,
        };
        call(&mut ws, id, body).await;
    }
    let membership = Membership::new(choir.id.clone(), ana.id.clone());
    call(&mut ws, 3, RequestBody::AddMembership { membership }).await;

    let delete = RequestBody::Delete {
        kind: EntityKind::Person,
        target: ana.id.remote().unwrap(),
    };
    assert_eq!(call(&mut ws, 4, delete.clone()).await, ReplyBody::Done);
    assert_eq!(error_code(call(&mut ws, 5, delete).await), ErrorCode::NotFound);

    let group_id = choir.id.remote().unwrap();
    let joins = call(
        &mut ws,
        6,
        RequestBody::FetchMemberships {
            group_ids: vec![group_id],
        },
    )
    .await;
    let ReplyBody::Memberships { memberships } = joins else {
        panic!("expected memberships");
    };
    assert!(memberships[&group_id].is_empty());
}

#[tokio::test]
async fn malformed_request_is_rejected_not_dropped() {
    let server = TestServer::start().await;
    let mut ws = connect(&server).await;

    let reply = send_text(&mut ws, "{\"id\": 7, \"type\": \"teleport\"}".into()).await;
    assert_eq!(reply.id, UNCORRELATED_ID);
    assert_eq!(error_code(reply.body), ErrorCode::Rejected);

    // The connection stays usable.
    assert_eq!(call(&mut ws, 8, RequestBody::Ping).await, ReplyBody::Pong);
}

#[tokio::test]
async fn connections_share_state() {
    let server = TestServer::start().await;
    let mut first = connect(&server).await;
    let mut second = connect(&server).await;
    let ana = Person::new(EntityId::generate(), "Ana", Utc::now());

    let create = RequestBody::Create {
        owner_id: "coach".into(),
        record: Record::Person(ana),
    };
    call(&mut first, 1, create).await;

    let fetch = RequestBody::FetchAll {
        kind: EntityKind::Person,
        owner_id: "coach".into(),
    };
    let ReplyBody::Records { records } = call(&mut second, 1, fetch).await else {
        panic!("expected records");
    };
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn handle_request_runs_without_a_socket() {
    let state = ServerState::with_db(RemoteDb::open_in_memory().unwrap());
    let text = Request::new(5, RequestBody::Ping).to_json().unwrap();

    let reply = server::handle_request(&text, &state).await;
    assert_eq!(reply, Reply::new(5, ReplyBody::Pong));
}

#[tokio::test]
async fn run_reports_bind_failure_from_a_spawned_task() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();
    let state = ServerState::with_db(RemoteDb::open_in_memory().unwrap());

    // The error crosses the task boundary, so it must be Send.
    let result = tokio::spawn(server::run(addr, state)).await.unwrap();

    assert!(result.is_err());
}
