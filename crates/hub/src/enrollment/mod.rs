// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound WebSocket enrolment: header validation, token resolution, and
//! fingerprint-based system binding. Outbound SSH enrolment needs none of
//! this — a tracked system record's id/host/port are sufficient, handled
//! directly by [`crate::manager`].

pub mod websocket;

use std::net::SocketAddr;

use axum::http::HeaderMap;

use crate::bus::Store;
use crate::error::HubError;
use crate::model::{Fingerprint, System, UserId, DEFAULT_AGENT_PORT};
use crate::token_map::TokenMap;

/// `X-Token` and `X-Beszel` are each bounded to this many ASCII bytes.
pub const MAX_HEADER_LEN: usize = 64;

/// Step 3's outcome: the token names a universal enrolment user, or it
/// matches zero-or-more fingerprint rows directly.
pub enum TokenResolution {
    Universal { user_id: UserId, expired_grace: bool },
    Fingerprint(Vec<Fingerprint>),
}

/// Steps 1-2: header presence/length/ASCII bounds, then semver parse.
pub fn validate_headers(token: &str, agent_version: &str) -> Result<semver::Version, HubError> {
    crate::transport::auth::validate_header_bounds(token, MAX_HEADER_LEN)?;
    crate::transport::auth::validate_header_bounds(agent_version, MAX_HEADER_LEN)?;
    semver::Version::parse(agent_version).map_err(|_| HubError::Unauthorized)
}

/// Step 3: resolve the token against the universal-token map first, falling
/// back to a direct fingerprint-row lookup. Either path coming up empty is
/// `Unauthorized`.
pub async fn resolve_token(
    token: &str,
    token_map: &TokenMap<UserId>,
    store: &dyn Store,
) -> Result<TokenResolution, HubError> {
    if let Some((user_id, expired_grace)) = token_map.get_with_grace(token) {
        return Ok(TokenResolution::Universal { user_id, expired_grace });
    }
    let rows = store.fingerprints_for_token(token).await?;
    if rows.is_empty() {
        return Err(HubError::Unauthorized);
    }
    Ok(TokenResolution::Fingerprint(rows))
}

/// `CF-Connecting-IP` → first of `X-Forwarded-For` → the socket's own
/// address, with no port, per the binding-resolution contract.
pub fn resolve_remote_ip(headers: &HeaderMap, remote_addr: SocketAddr) -> String {
    if let Some(ip) = non_empty_header(headers, "CF-Connecting-IP") {
        return ip;
    }
    if let Some(forwarded) = headers.get("X-Forwarded-For").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_owned();
            }
        }
    }
    remote_addr.ip().to_string()
}

fn non_empty_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

/// Step 6: resolve the agent's fingerprint-challenge reply against the step
/// 3 token resolution. Returns the bound system id and whether a brand-new
/// system was created for it.
pub async fn resolve_binding(
    resolution: TokenResolution,
    token: &str,
    agent_fingerprint: &str,
    remote_ip: &str,
    agent_hostname: Option<&str>,
    agent_port: Option<&str>,
    store: &dyn Store,
) -> Result<(String, bool), HubError> {
    match resolution {
        TokenResolution::Fingerprint(rows) if rows.len() == 1 => {
            let mut row = rows.into_iter().next().expect("len == 1 checked above");
            if row.fingerprint.is_empty() {
                row.fingerprint = agent_fingerprint.to_owned();
                store.save_fingerprint(&row).await?;
                Ok((row.system_id, false))
            } else if crate::transport::auth::constant_time_eq(&row.fingerprint, agent_fingerprint) {
                Ok((row.system_id, false))
            } else {
                Err(HubError::FingerprintMismatch)
            }
        }
        TokenResolution::Fingerprint(rows) => rows
            .into_iter()
            .find(|row| crate::transport::auth::constant_time_eq(&row.fingerprint, agent_fingerprint))
            .map(|row| (row.system_id, false))
            .ok_or(HubError::FingerprintMismatch),
        TokenResolution::Universal { user_id, expired_grace } => {
            let matching = store.fingerprints_for_token(token).await?;
            if let Some(row) = matching.into_iter().find(|r| crate::transport::auth::constant_time_eq(&r.fingerprint, agent_fingerprint)) {
                return Ok((row.system_id, false));
            }
            if expired_grace {
                return Err(HubError::TokenExpired);
            }
            create_system_for_universal_token(token, user_id, agent_fingerprint, remote_ip, agent_hostname, agent_port, store)
                .await
        }
    }
}

async fn create_system_for_universal_token(
    token: &str,
    user_id: UserId,
    agent_fingerprint: &str,
    remote_ip: &str,
    agent_hostname: Option<&str>,
    agent_port: Option<&str>,
    store: &dyn Store,
) -> Result<(String, bool), HubError> {
    let name = agent_hostname.filter(|h| !h.is_empty()).unwrap_or(remote_ip).to_owned();
    let port: u16 = agent_port
        .filter(|p| !p.is_empty())
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(|| DEFAULT_AGENT_PORT.parse().expect("DEFAULT_AGENT_PORT is a valid u16"));

    let system_id = uuid::Uuid::new_v4().to_string();
    let system = System::new(system_id.clone(), name, remote_ip.to_owned(), port, vec![user_id]);
    let fingerprint = Fingerprint {
        id: uuid::Uuid::new_v4().to_string(),
        system_id: system_id.clone(),
        token: token.to_owned(),
        fingerprint: agent_fingerprint.to_owned(),
    };
    store.create_system(system, fingerprint).await?;
    Ok((system_id, true))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
