// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Each connection is a strict request/response loop: every text frame is
//! one [`Request`] and gets exactly one [`Reply`] with the same id.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info};

use rc_core::protocol::{ErrorCode, Reply, Request, UNCORRELATED_ID};

use crate::state::ServerState;

/// Run the WebSocket server on the given address.
pub async fn run(
    addr: SocketAddr,
    state: ServerState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", addr);
    serve(listener, state).await?;
    Ok(())
}

/// Accepts connections on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    state: ServerState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: ServerState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    debug!("New WebSocket connection from: {}", peer_addr);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let reply = handle_request(&text, &state).await;
                ws_sink.send(Message::Text(reply.to_json()?.into())).await?;
            }
            Ok(Message::Close(_)) => {
                debug!("Client {} disconnected", peer_addr);
                break;
            }
            Ok(Message::Ping(data)) => {
                ws_sink.send(Message::Pong(data)).await?;
            }
            Ok(_) => {}
            Err(e) => {
                error!("WebSocket error from {}: {}", peer_addr, e);
                break;
            }
        }
    }

    debug!("Connection closed: {}", peer_addr);
    Ok(())
}

/// Parses and executes one request. Unparseable input is answered with a
/// `rejected` error under [`UNCORRELATED_ID`].
pub(crate) async fn handle_request(text: &str, state: &ServerState) -> Reply {
    let request = match Request::from_json(text) {
        Ok(request) => request,
        Err(e) => {
            debug!("Malformed request: {}", e);
            return Reply::error(
                UNCORRELATED_ID,
                ErrorCode::Rejected,
                format!("malformed request: {}", e),
            );
        }
    };
    debug!("Request {}: {:?}", request.id, request.body);

    let body = state.execute(request.body).await;
    Reply::new(request.id, body)
}
