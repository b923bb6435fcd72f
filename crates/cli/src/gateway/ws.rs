// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket implementation of the remote gateway.
//!
//! Requests are serialized over a single connection, one in flight at a
//! time. Connection handling and reply correlation live in
//! [`round_trip`]; this module maps replies onto gateway results.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rc_core::protocol::{ErrorCode, ReplyBody, Request, RequestBody};
use rc_core::{EntityKind, Membership, Record};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::transport::{round_trip, Deadlines, Transport, WebSocketTransport};
use super::{GatewayFuture, RemoteError, RemoteGateway, RemoteResult};

/// Configuration for the WebSocket gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// URL of the remote server.
    pub url: String,
    /// Upper bound for one request, connect included.
    pub request_timeout: Duration,
    /// Upper bound for establishing the connection.
    pub connect_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            url: "ws://127.0.0.1:7890".to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Remote gateway speaking the rc-remote WebSocket protocol.
pub struct WsGateway<T: Transport = WebSocketTransport> {
    config: GatewayConfig,
    transport: Mutex<T>,
    next_id: AtomicU64,
}

impl WsGateway<WebSocketTransport> {
    /// Create a gateway with the default WebSocket transport.
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_transport(config, WebSocketTransport::new())
    }
}

impl<T: Transport> WsGateway<T> {
    /// Create a gateway with a custom transport (for testing).
    pub fn with_transport(config: GatewayConfig, transport: T) -> Self {
        WsGateway {
            config,
            transport: Mutex::new(transport),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the configured server URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Round-trips a ping. Used as the reachability probe.
    pub async fn ping(&self) -> RemoteResult<()> {
        match self.call(RequestBody::Ping).await? {
            ReplyBody::Pong => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Closes the connection, if open.
    pub async fn close(&self) {
        let mut transport = self.transport.lock().await;
        let _ = transport.disconnect().await;
    }

    fn deadlines(&self) -> Deadlines {
        Deadlines {
            connect: self.config.connect_timeout,
            request: self.config.request_timeout,
        }
    }

    /// Sends one request and maps its reply. Transport failures of any
    /// kind are transient.
    async fn call(&self, body: RequestBody) -> RemoteResult<ReplyBody> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut transport = self.transport.lock().await;

        let reply = round_trip(
            &mut *transport,
            &self.config.url,
            self.deadlines(),
            Request::new(id, body),
        )
        .await
        .map_err(|e| RemoteError::Transient(e.to_string()))?;

        match reply.body {
            ReplyBody::Error { code, message } => Err(match code {
                ErrorCode::NotFound => RemoteError::NotFound,
                ErrorCode::Duplicate => RemoteError::Duplicate,
                ErrorCode::Rejected => RemoteError::Rejected(message),
                ErrorCode::Internal => RemoteError::Transient(message),
            }),
            body => Ok(body),
        }
    }
}

fn unexpected(body: &ReplyBody) -> RemoteError {
    RemoteError::Transient(format!("unexpected reply: {body:?}"))
}

impl<T: Transport> RemoteGateway for WsGateway<T> {
    fn fetch_all(&self, kind: EntityKind, owner_id: String) -> GatewayFuture<'_, Vec<Record>> {
        Box::pin(async move {
            match self.call(RequestBody::FetchAll { kind, owner_id }).await? {
                ReplyBody::Records { records } => Ok(records),
                other => Err(unexpected(&other)),
            }
        })
    }

    fn create(&self, owner_id: String, record: Record) -> GatewayFuture<'_, Record> {
        Box::pin(async move {
            match self.call(RequestBody::Create { owner_id, record }).await? {
                ReplyBody::Record { record } => Ok(record),
                other => Err(unexpected(&other)),
            }
        })
    }

    fn update(&self, record: Record) -> GatewayFuture<'_, Record> {
        Box::pin(async move {
            match self.call(RequestBody::Update { record }).await? {
                ReplyBody::Record { record } => Ok(record),
                other => Err(unexpected(&other)),
            }
        })
    }

    fn delete(&self, kind: EntityKind, id: Uuid) -> GatewayFuture<'_, ()> {
        Box::pin(async move {
            match self.call(RequestBody::Delete { kind, target: id }).await? {
                ReplyBody::Done => Ok(()),
                other => Err(unexpected(&other)),
            }
        })
    }

    fn add_membership(&self, membership: Membership) -> GatewayFuture<'_, ()> {
        Box::pin(async move {
            match self.call(RequestBody::AddMembership { membership }).await {
                Ok(ReplyBody::Done) | Err(RemoteError::Duplicate) => Ok(()),
                Ok(other) => Err(unexpected(&other)),
                Err(e) => Err(e),
            }
        })
    }

    fn remove_membership(&self, membership: Membership) -> GatewayFuture<'_, ()> {
        Box::pin(async move {
            match self.call(RequestBody::RemoveMembership { membership }).await? {
                ReplyBody::Done => Ok(()),
                other => Err(unexpected(&other)),
            }
        })
    }

    fn fetch_memberships(
        &self,
        group_ids: Vec<Uuid>,
    ) -> GatewayFuture<'_, BTreeMap<Uuid, Vec<Uuid>>> {
        Box::pin(async move {
            match self.call(RequestBody::FetchMemberships { group_ids }).await? {
                ReplyBody::Memberships { memberships } => Ok(memberships),
                other => Err(unexpected(&other)),
            }
        })
    }
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
