// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A minimal in-process [`Store`] so the hub can run standalone without the
//! external record store the spec treats as an out-of-core collaborator.
//! Real deployments are expected to supply their own implementation backed
//! by that store; this one keeps everything in memory and is lost on
//! restart.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use crate::bus::Store;
use crate::error::HubError;
use crate::model::{Alert, ContainerStatsRecord, Fingerprint, Info, System, SystemId, SystemStatsRecord, SystemStatus};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Default)]
struct Inner {
    systems: HashMap<SystemId, System>,
    fingerprints: HashMap<String, Fingerprint>,
    alerts: HashMap<SystemId, Vec<Alert>>,
    has_user: bool,
}

/// In-memory [`Store`]. Stats rows are accepted and dropped: nothing in
/// SPEC_FULL.md's core reads them back, and the retention/aggregation of
/// those rows is explicitly the record store's job.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl InMemoryStore {
    pub(crate) fn seed_alert(&self, alert: Alert) {
        self.inner.lock().unwrap().alerts.entry(alert.system_id.clone()).or_default().push(alert);
    }
}

impl Store for InMemoryStore {
    fn save_system(&self, system: &System) -> BoxFuture<'_, Result<(), HubError>> {
        let system = system.clone();
        Box::pin(async move {
            self.inner.lock().unwrap().systems.insert(system.id().to_owned(), system);
            Ok(())
        })
    }

    fn update_info(&self, system_id: &SystemId, status: SystemStatus, info: Info) -> BoxFuture<'_, Result<(), HubError>> {
        let system_id = system_id.clone();
        Box::pin(async move {
            let mut guard = self.inner.lock().unwrap();
            let system = guard.systems.get_mut(&system_id).ok_or(HubError::SystemNotFound)?;
            system.status = status;
            system.info = Some(info);
            Ok(())
        })
    }

    fn append_system_stats_row(&self, _row: SystemStatsRecord) -> BoxFuture<'_, Result<(), HubError>> {
        Box::pin(async { Ok(()) })
    }

    fn append_container_stats_row(&self, _row: ContainerStatsRecord) -> BoxFuture<'_, Result<(), HubError>> {
        Box::pin(async { Ok(()) })
    }

    fn clear_triggered_alerts(&self, system_id: &SystemId) -> BoxFuture<'_, Result<(), HubError>> {
        let system_id = system_id.clone();
        Box::pin(async move {
            if let Some(alerts) = self.inner.lock().unwrap().alerts.get_mut(&system_id) {
                alerts.iter_mut().for_each(|a| a.triggered = false);
            }
            Ok(())
        })
    }

    fn set_alert_triggered(
        &self,
        alert_id: &str,
        triggered: bool,
        last_fired_unix_ms: Option<i64>,
    ) -> BoxFuture<'_, Result<(), HubError>> {
        let alert_id = alert_id.to_owned();
        Box::pin(async move {
            let mut guard = self.inner.lock().unwrap();
            let alert = guard
                .alerts
                .values_mut()
                .flat_map(|alerts| alerts.iter_mut())
                .find(|a| a.id == alert_id)
                .ok_or(HubError::AlertNotFound)?;
            alert.triggered = triggered;
            alert.last_fired_unix_ms = last_fired_unix_ms;
            Ok(())
        })
    }

    fn alerts_for_system(&self, system_id: &SystemId) -> BoxFuture<'_, Result<Vec<Alert>, HubError>> {
        let system_id = system_id.clone();
        Box::pin(async move { Ok(self.inner.lock().unwrap().alerts.get(&system_id).cloned().unwrap_or_default()) })
    }

    fn list_non_paused_systems(&self) -> BoxFuture<'_, Result<Vec<System>, HubError>> {
        Box::pin(async move {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .systems
                .values()
                .filter(|s| s.status != SystemStatus::Paused)
                .cloned()
                .collect())
        })
    }

    fn fingerprints_for_token(&self, token: &str) -> BoxFuture<'_, Result<Vec<Fingerprint>, HubError>> {
        let token = token.to_owned();
        Box::pin(async move {
            Ok(self.inner.lock().unwrap().fingerprints.values().filter(|f| f.token == token).cloned().collect())
        })
    }

    fn create_system(&self, system: System, fingerprint: Fingerprint) -> BoxFuture<'_, Result<(), HubError>> {
        Box::pin(async move {
            let mut guard = self.inner.lock().unwrap();
            guard.systems.insert(system.id().to_owned(), system);
            guard.fingerprints.insert(fingerprint.id.clone(), fingerprint);
            Ok(())
        })
    }

    fn save_fingerprint(&self, fingerprint: &Fingerprint) -> BoxFuture<'_, Result<(), HubError>> {
        let fingerprint = fingerprint.clone();
        Box::pin(async move {
            self.inner.lock().unwrap().fingerprints.insert(fingerprint.id.clone(), fingerprint);
            Ok(())
        })
    }

    fn has_any_users(&self) -> BoxFuture<'_, Result<bool, HubError>> {
        Box::pin(async move { Ok(self.inner.lock().unwrap().has_user) })
    }

    fn create_first_user(&self, _payload: serde_json::Value) -> BoxFuture<'_, Result<(), HubError>> {
        Box::pin(async move {
            self.inner.lock().unwrap().has_user = true;
            Ok(())
        })
    }

    fn dump_config_yaml(&self) -> BoxFuture<'_, Result<String, HubError>> {
        Box::pin(async move {
            let systems: Vec<System> = self.inner.lock().unwrap().systems.values().cloned().collect();
            serde_yaml::to_string(&systems).map_err(|_| HubError::StoreError)
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
