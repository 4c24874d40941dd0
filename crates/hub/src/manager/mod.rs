// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-system state machine, scheduling, stats fetching, persistence, and
//! alert dispatch. The system map is the only shared mutable collection
//! here; everything else about a system is owned by its own updater.

pub mod sweeper;
pub mod worker;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::bus::Store;
use crate::config::HubConfig;
use crate::error::HubError;
use crate::identity::Identity;
use crate::model::{CombinedData, System, SystemId, SystemStatus};
use crate::transport::Transport;

/// Maximum per-system stagger delay applied to first polls during
/// [`SystemManager::initialize`], regardless of how large the poll
/// interval or fleet size is.
const MAX_INITIAL_STAGGER: Duration = Duration::from_secs(2);

/// Which transport variant a system expects. WebSocket systems only exist
/// while their socket is open; they are never dialed by the updater.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Ssh,
    WebSocket,
}

/// In-memory state for one monitored system, owned jointly by the manager
/// (for lookup and teardown) and that system's updater task (for everything
/// else).
pub struct SystemState {
    pub id: SystemId,
    pub name: RwLock<String>,
    pub host: RwLock<String>,
    pub port: RwLock<u16>,
    pub status: RwLock<SystemStatus>,
    pub kind: TransportKind,
    pub transport: RwLock<Option<Arc<dyn Transport>>>,
    pub agent_version: RwLock<Option<semver::Version>>,
    pub last_data: RwLock<Option<CombinedData>>,
    pub last_persisted_at: RwLock<Option<Instant>>,
    pub retry_count: AtomicU32,
    pub cancel: CancellationToken,
}

impl SystemState {
    fn new(
        id: SystemId,
        name: String,
        host: String,
        port: u16,
        status: SystemStatus,
        kind: TransportKind,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: RwLock::new(name),
            host: RwLock::new(host),
            port: RwLock::new(port),
            status: RwLock::new(status),
            kind,
            transport: RwLock::new(None),
            agent_version: RwLock::new(None),
            last_data: RwLock::new(None),
            last_persisted_at: RwLock::new(None),
            retry_count: AtomicU32::new(0),
            cancel,
        })
    }
}

/// Owns every monitored system's in-memory state and drives its lifecycle.
pub struct SystemManager {
    systems: RwLock<HashMap<SystemId, Arc<SystemState>>>,
    config: HubConfig,
    identity: Arc<Identity>,
    store: Arc<dyn Store>,
    shutdown: CancellationToken,
}

impl SystemManager {
    pub fn new(
        config: HubConfig,
        identity: Arc<Identity>,
        store: Arc<dyn Store>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self { systems: RwLock::new(HashMap::new()), config, identity, store, shutdown })
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Spawn the SSH sweep controller alongside per-system updaters. Exits
    /// once the manager's shutdown token fires.
    pub fn spawn_sweeper(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        let shutdown = manager.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sweeper::run(manager) => {}
                _ = shutdown.cancelled() => {}
            }
        });
    }

    /// Load all non-paused systems and begin monitoring each, staggering
    /// their first polls evenly across the poll interval but capping the
    /// per-system delay at [`MAX_INITIAL_STAGGER`].
    pub async fn initialize(self: &Arc<Self>) -> Result<(), HubError> {
        let systems = self.store.list_non_paused_systems().await?;
        let n = systems.len().max(1);
        let stagger_unit = self.config.poll_interval() / n as u32;

        for (index, system) in systems.into_iter().enumerate() {
            let delay = (stagger_unit * index as u32).min(MAX_INITIAL_STAGGER);
            self.bring_up(system, delay).await;
        }
        Ok(())
    }

    /// Add or replace a system's tracked state, then spawn its updater.
    ///
    /// If the id is already tracked, it is cleanly removed first.
    pub async fn add_record(self: &Arc<Self>, system: System) -> Result<(), HubError> {
        if system.host.is_empty() {
            return Err(HubError::BadRequest);
        }
        if self.systems.read().await.contains_key(system.id()) {
            self.remove_system(system.id()).await?;
        }
        self.bring_up(system, Duration::ZERO).await;
        Ok(())
    }

    /// Atomic bind used from the enrolment path: associate an already
    /// accepted WebSocket with a (possibly new) system id.
    pub async fn add_websocket_system(
        self: &Arc<Self>,
        id: SystemId,
        agent_version: semver::Version,
        transport: Arc<dyn Transport>,
    ) -> Result<(), HubError> {
        let existing = self.systems.read().await.get(&id).cloned();
        let state = match existing {
            Some(state) => state,
            None => {
                let cancel = self.shutdown.child_token();
                let state = SystemState::new(
                    id.clone(),
                    String::new(),
                    String::new(),
                    0,
                    SystemStatus::Pending,
                    TransportKind::WebSocket,
                    cancel,
                );
                self.systems.write().await.insert(id.clone(), Arc::clone(&state));
                let manager = Arc::clone(self);
                let state_for_worker = Arc::clone(&state);
                tokio::spawn(async move {
                    worker::run(manager, state_for_worker, Duration::ZERO).await;
                });
                state
            }
        };

        *state.agent_version.write().await = Some(agent_version);
        *state.transport.write().await = Some(transport);
        Ok(())
    }

    /// Cancel a system's updater, close its transport, and drop it from the
    /// map. Idempotent: subsequent calls after the first return `NotFound`.
    pub async fn remove_system(&self, id: &str) -> Result<(), HubError> {
        let state = self.systems.write().await.remove(id).ok_or(HubError::SystemNotFound)?;
        state.cancel.cancel();
        if let Some(transport) = state.transport.write().await.take() {
            transport.close().await;
        }
        Ok(())
    }

    /// Force a reconnect after the bound fingerprint row's token changes:
    /// close a live WebSocket (SSH systems just redial on their own next
    /// tick, so there is nothing to close there) and mark the system down.
    /// The agent re-binds to the same id once it reconnects with the new
    /// token, through the normal enrolment path.
    pub async fn force_reconnect(&self, id: &str) -> Result<(), HubError> {
        let state = {
            let systems = self.systems.read().await;
            systems.get(id).cloned().ok_or(HubError::SystemNotFound)?
        };
        if state.kind == TransportKind::WebSocket {
            if let Some(transport) = state.transport.write().await.take() {
                transport.close().await;
            }
        }
        self.set_status(id, SystemStatus::Down).await
    }

    /// Mutate in-memory status and persist it, firing status-transition
    /// alerts when the status actually changes.
    pub async fn set_status(&self, id: &str, status: SystemStatus) -> Result<(), HubError> {
        let state = {
            let systems = self.systems.read().await;
            systems.get(id).cloned().ok_or(HubError::SystemNotFound)?
        };

        let previous = {
            let mut guard = state.status.write().await;
            let previous = *guard;
            *guard = status;
            previous
        };

        if status == SystemStatus::Paused {
            if let Some(transport) = state.transport.write().await.take() {
                transport.close().await;
            }
            *state.last_data.write().await = None;
            self.store.clear_triggered_alerts(&state.id).await?;
        }

        if previous != status && matches!(status, SystemStatus::Up | SystemStatus::Down) {
            self.handle_status_alerts(&state.id, status).await;
        }

        Ok(())
    }

    /// Snapshot of every tracked system's state, used by the sweeper.
    pub(crate) async fn snapshot(&self) -> Vec<Arc<SystemState>> {
        self.systems.read().await.values().cloned().collect()
    }

    pub(crate) fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    async fn bring_up(self: &Arc<Self>, system: System, initial_delay: Duration) {
        let cancel = self.shutdown.child_token();
        let state = SystemState::new(
            system.id().to_owned(),
            system.name.clone(),
            system.host.clone(),
            system.port,
            system.status,
            TransportKind::Ssh,
            cancel,
        );

        self.systems.write().await.insert(state.id.clone(), Arc::clone(&state));

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            worker::run(manager, state, initial_delay).await;
        });
    }

    /// Out-of-core alert dispatch boundary: the core guarantees at most one
    /// call per status transition, never implements delivery.
    async fn handle_status_alerts(&self, _system_id: &SystemId, _new_status: SystemStatus) {
        // Delivery is an external collaborator's responsibility.
    }

    /// Out-of-core alert dispatch boundary: called once per poll for every
    /// alert whose breach state just changed, after the new state is
    /// persisted via [`Store::set_alert_triggered`]. Never implements
    /// delivery itself.
    pub(crate) async fn handle_system_alert(&self, _alert: &crate::model::Alert, _triggered: bool) {
        // Delivery is an external collaborator's responsibility.
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
