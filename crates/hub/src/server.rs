// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface: agent enrolment, key distribution, universal-token
//! management, and the thin pass-throughs to the external record store
//! (`first-run`, `config-yaml`, `create-user`).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::bus::Store;
use crate::config::HubConfig;
use crate::enrollment::websocket::agent_connect;
use crate::error::HubError;
use crate::identity::Identity;
use crate::manager::SystemManager;
use crate::model::UserId;
use crate::token_map::TokenMap;

pub struct AppState {
    pub config: HubConfig,
    pub identity: Arc<Identity>,
    pub manager: Arc<SystemManager>,
    pub store: Arc<dyn Store>,
    pub token_map: Arc<TokenMap<UserId>>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/beszel/agent-connect", get(agent_connect))
        .route("/api/beszel/getkey", get(get_key))
        .route("/api/beszel/universal-token", get(universal_token))
        .route("/api/beszel/first-run", get(first_run))
        .route("/api/beszel/config-yaml", get(config_yaml))
        .route("/api/beszel/create-user", post(create_user))
        .route("/api/beszel/version", get(version))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct VersionResponse {
    version: &'static str,
}

/// Trivial unauthenticated liveness/version probe, used by load balancers
/// and an agent's own "is the hub reachable" pre-flight.
async fn version() -> Response {
    Json(VersionResponse { version: env!("CARGO_PKG_VERSION") }).into_response()
}

#[derive(Serialize)]
struct GetKeyResponse {
    key: String,
    v: &'static str,
}

async fn get_key(State(state): State<Arc<AppState>>) -> Response {
    match state.identity.authorized_keys_line() {
        Ok(key) => Json(GetKeyResponse { key, v: env!("CARGO_PKG_VERSION") }).into_response(),
        Err(err) => err.to_http_response("failed to read signing key").into_response(),
    }
}

#[derive(Deserialize)]
struct UniversalTokenQuery {
    enable: Option<String>,
    user: Option<String>,
    token: Option<String>,
}

#[derive(Serialize)]
struct UniversalTokenResponse {
    token: String,
    active: bool,
}

async fn universal_token(State(state): State<Arc<AppState>>, Query(query): Query<UniversalTokenQuery>) -> Response {
    let Some(user_id) = query.user else {
        return HubError::BadRequest.to_http_response("missing user").into_response();
    };

    match query.enable.as_deref() {
        Some("1") => {
            let token = query.token.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            state.token_map.set(token.clone(), user_id, state.config.universal_token_ttl());
            Json(UniversalTokenResponse { token, active: true }).into_response()
        }
        Some("0") => {
            state.token_map.remove_by_value(&user_id);
            Json(UniversalTokenResponse { token: String::new(), active: false }).into_response()
        }
        _ => match state.token_map.get_by_value(&user_id) {
            Some((token, _)) => Json(UniversalTokenResponse { token, active: true }).into_response(),
            None => Json(UniversalTokenResponse { token: String::new(), active: false }).into_response(),
        },
    }
}

#[derive(Serialize)]
struct FirstRunResponse {
    #[serde(rename = "firstRun")]
    first_run: bool,
}

async fn first_run(State(state): State<Arc<AppState>>) -> Response {
    match state.store.has_any_users().await {
        Ok(has_users) => Json(FirstRunResponse { first_run: !has_users }).into_response(),
        Err(err) => err.to_http_response("failed to check for existing users").into_response(),
    }
}

async fn config_yaml(State(state): State<Arc<AppState>>) -> Response {
    match state.store.dump_config_yaml().await {
        Ok(yaml) => ([("content-type", "application/yaml")], yaml).into_response(),
        Err(err) => err.to_http_response("failed to render config").into_response(),
    }
}

async fn create_user(State(state): State<Arc<AppState>>, Json(payload): Json<serde_json::Value>) -> Response {
    match state.store.has_any_users().await {
        Ok(true) => HubError::SystemExists.to_http_response("a user already exists").into_response(),
        Ok(false) => match state.store.create_first_user(payload).await {
            Ok(()) => axum::http::StatusCode::CREATED.into_response(),
            Err(err) => err.to_http_response("failed to create user").into_response(),
        },
        Err(err) => err.to_http_response("failed to check for existing users").into_response(),
    }
}
