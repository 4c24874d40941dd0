// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Beszel hub: agent fleet manager. Authenticates remote agent connections,
//! maintains bidirectional channels (outbound SSH poll, accepted WebSocket
//! push), polls on a staggered schedule, and persists stats/status/alerts
//! through the record store's [`bus::Store`] boundary.

pub mod bus;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod identity;
pub mod manager;
pub mod model;
pub mod server;
pub mod store;
pub mod token_map;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::bus::Store;
use crate::config::HubConfig;
use crate::identity::Identity;
use crate::manager::SystemManager;
use crate::model::UserId;
use crate::server::AppState;
use crate::store::InMemoryStore;
use crate::token_map::TokenMap;

/// Run the hub until shutdown. `store` defaults to an in-memory stand-in
/// when `None`; production deployments are expected to pass their own.
pub async fn run(config: HubConfig, store: Option<Arc<dyn Store>>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let identity = Identity::load_or_create(&config.data_dir).await?;
    let store: Arc<dyn Store> = store.unwrap_or_else(|| Arc::new(InMemoryStore::new()));
    let token_map = Arc::new(TokenMap::<UserId>::new());

    let manager = SystemManager::new(config.clone(), Arc::clone(&identity), Arc::clone(&store), shutdown.clone());
    manager.initialize().await?;
    manager.spawn_sweeper();

    let state = Arc::new(AppState { config, identity, manager, store, token_map });
    let router = server::build_router(Arc::clone(&state));

    tracing::info!(addr = %addr, "beszel hub listening");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    Ok(())
}
