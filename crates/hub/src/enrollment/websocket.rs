// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Axum handler for `GET /api/beszel/agent-connect`: validates headers and
//! the token (steps 1-3), upgrades, then runs the fingerprint-challenge
//! handshake (steps 4-7) on the raw socket before handing it to
//! [`crate::transport::ws::WsTransport`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};

use crate::enrollment::{self, TokenResolution};
use crate::error::HubError;
use crate::model::FingerprintResponse;
use crate::server::AppState;
use crate::transport::frame::{self, FrameAction};
use crate::transport::ws::WsTransport;

const TOKEN_HEADER: &str = "X-Token";
const VERSION_HEADER: &str = "X-Beszel";

pub async fn agent_connect(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let token = match header_value(&headers, TOKEN_HEADER) {
        Some(v) => v,
        None => return HubError::BadRequest.to_http_response("missing X-Token").into_response(),
    };
    let agent_version = match header_value(&headers, VERSION_HEADER) {
        Some(v) => v,
        None => return HubError::BadRequest.to_http_response("missing X-Beszel").into_response(),
    };

    let version = match enrollment::validate_headers(&token, &agent_version) {
        Ok(v) => v,
        Err(HubError::BadRequest) => {
            return HubError::BadRequest.to_http_response("missing or oversize header").into_response()
        }
        Err(_) => return HubError::Unauthorized.to_http_response("invalid agent version").into_response(),
    };

    let resolution = match enrollment::resolve_token(&token, &state.token_map, state.store.as_ref()).await {
        Ok(r) => r,
        Err(_) => return HubError::Unauthorized.to_http_response("invalid token").into_response(),
    };

    let remote_ip = enrollment::resolve_remote_ip(&headers, remote_addr);

    ws.on_upgrade(move |socket| async move {
        if let Err(err) = run_handshake(socket, state, token, version, resolution, remote_ip).await {
            tracing::debug!(err = %err, "agent handshake failed");
        }
    })
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
}

/// Steps 4-7, run after the HTTP upgrade has already succeeded. A failure
/// here simply drops the socket: there is no HTTP status left to write.
async fn run_handshake(
    mut socket: WebSocket,
    state: Arc<AppState>,
    token: String,
    agent_version: semver::Version,
    resolution: TokenResolution,
    remote_ip: String,
) -> Result<(), HubError> {
    let request_system_info = matches!(resolution, TokenResolution::Universal { .. });
    let challenge = serde_json::json!({ "request_system_info": request_system_info });
    let bytes = frame::encode(FrameAction::CheckFingerprint, &challenge)?;
    socket.send(Message::Binary(bytes.into())).await.map_err(|_| HubError::UpgradeFailed)?;

    let reply_bytes = match socket.next().await {
        Some(Ok(Message::Binary(bytes))) => bytes,
        _ => return Err(HubError::ProtocolViolation),
    };
    let reply = frame::decode(&reply_bytes)?;
    if reply.action != FrameAction::FingerprintResponse {
        return Err(HubError::ProtocolViolation);
    }
    let reply: FingerprintResponse = reply.payload_as()?;

    let (system_id, _created) = enrollment::resolve_binding(
        resolution,
        &token,
        &reply.fingerprint,
        &remote_ip,
        reply.hostname.as_deref(),
        reply.port.as_deref(),
        state.store.as_ref(),
    )
    .await?;

    let transport = WsTransport::spawn(socket, state.manager.shutdown_token());
    state.manager.add_websocket_system(system_id, agent_version, transport).await
}
