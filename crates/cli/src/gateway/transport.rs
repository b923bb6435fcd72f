// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Frame transport for the remote gateway.
//!
//! A [`Transport`] only moves protocol frames. [`round_trip`] adds the
//! gateway's connection policy on top: connect lazily under a deadline,
//! send one request, and wait for the reply carrying its id.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rc_core::protocol::{Reply, ReplyBody, Request, UNCORRELATED_ID};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("socket error: {0}")]
    Socket(String),

    #[error("malformed frame: {0}")]
    Malformed(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by transport calls.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// A duplex channel of protocol frames.
pub trait Transport: Send {
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()>;

    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    fn send(&mut self, request: Request) -> TransportFuture<'_, ()>;

    /// Next reply, or `None` once the peer has closed.
    fn recv(&mut self) -> TransportFuture<'_, Option<Reply>>;

    fn is_connected(&self) -> bool;
}

/// Time limits for one round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    /// Establishing the connection, when there is none.
    pub connect: Duration,
    /// The whole round trip, connect included.
    pub request: Duration,
}

/// Sends `request` and returns the reply carrying its id.
///
/// On any failure the connection is dropped: a reply arriving late must
/// never be read as the answer to a later request.
pub async fn round_trip<T: Transport>(
    transport: &mut T,
    url: &str,
    deadlines: Deadlines,
    request: Request,
) -> TransportResult<Reply> {
    let result = tokio::time::timeout(
        deadlines.request,
        exchange(&mut *transport, url, deadlines.connect, request),
    )
    .await
    .unwrap_or(Err(TransportError::RequestTimeout(deadlines.request)));

    if result.is_err() {
        let _ = transport.disconnect().await;
    }
    result
}

async fn exchange<T: Transport>(
    transport: &mut T,
    url: &str,
    connect_timeout: Duration,
    request: Request,
) -> TransportResult<Reply> {
    if !transport.is_connected() {
        debug!("connecting to {}", url);
        tokio::time::timeout(connect_timeout, transport.connect(url))
            .await
            .map_err(|_| TransportError::ConnectTimeout(connect_timeout))??;
    }

    let id = request.id;
    transport.send(request).await?;

    loop {
        match transport.recv().await? {
            Some(reply) if reply.id == id => return Ok(reply),
            // One request in flight per connection, so an unparseable frame
            // the server reports can only be ours.
            Some(reply)
                if reply.id == UNCORRELATED_ID
                    && matches!(reply.body, ReplyBody::Error { .. }) =>
            {
                return Ok(reply)
            }
            Some(stale) => debug!("discarding reply {} while waiting for {}", stale.id, id),
            None => return Err(TransportError::ConnectionClosed),
        }
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport over tokio-tungstenite.
#[derive(Default)]
pub struct WebSocketTransport {
    socket: Option<Socket>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_string();
        Box::pin(async move {
            let (socket, _) = tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            self.socket = Some(socket);
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut socket) = self.socket.take() {
                let _ = socket.close(None).await;
            }
            Ok(())
        })
    }

    fn send(&mut self, request: Request) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let text = request
                .to_json()
                .map_err(|e| TransportError::Malformed(e.to_string()))?;
            let socket = self.socket.as_mut().ok_or(TransportError::ConnectionClosed)?;

            // `send` flushes, so a dead peer surfaces here rather than in recv.
            let sent = socket.send(Message::Text(text.into())).await;
            if let Err(e) = sent {
                self.socket = None;
                return Err(TransportError::Socket(e.to_string()));
            }
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<Reply>> {
        Box::pin(async move {
            let socket = self.socket.as_mut().ok_or(TransportError::ConnectionClosed)?;
            let outcome = loop {
                match socket.next().await {
                    Some(Ok(Message::Text(text))) => {
                        break Reply::from_json(&text)
                            .map(Some)
                            .map_err(|e| TransportError::Malformed(e.to_string()));
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(None),
                    // Control and binary frames carry no replies.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(TransportError::Socket(e.to_string())),
                }
            };

            if !matches!(outcome, Ok(Some(_))) {
                self.socket = None;
            }
            outcome
        })
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }
}
