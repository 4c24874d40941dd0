// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::pin::Pin;
use std::sync::Mutex as StdMutex;

use super::*;
use crate::model::{Alert, ContainerStatsRecord, Info, SystemStatsRecord};

type Fut<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Minimal in-memory [`Store`] for exercising the manager without a real
/// record store.
#[derive(Default)]
struct FakeStore {
    systems: StdMutex<Vec<System>>,
    cleared_alerts: StdMutex<Vec<SystemId>>,
}

impl Store for FakeStore {
    fn save_system(&self, system: &System) -> Fut<'_, Result<(), HubError>> {
        self.systems.lock().unwrap().push(system.clone());
        Box::pin(async { Ok(()) })
    }

    fn update_info(&self, _system_id: &SystemId, _status: SystemStatus, _info: Info) -> Fut<'_, Result<(), HubError>> {
        Box::pin(async { Ok(()) })
    }

    fn append_system_stats_row(&self, _row: SystemStatsRecord) -> Fut<'_, Result<(), HubError>> {
        Box::pin(async { Ok(()) })
    }

    fn append_container_stats_row(&self, _row: ContainerStatsRecord) -> Fut<'_, Result<(), HubError>> {
        Box::pin(async { Ok(()) })
    }

    fn clear_triggered_alerts(&self, system_id: &SystemId) -> Fut<'_, Result<(), HubError>> {
        self.cleared_alerts.lock().unwrap().push(system_id.clone());
        Box::pin(async { Ok(()) })
    }

    fn alerts_for_system(&self, _system_id: &SystemId) -> Fut<'_, Result<Vec<Alert>, HubError>> {
        Box::pin(async { Ok(vec![]) })
    }

    fn set_alert_triggered(&self, _alert_id: &str, _triggered: bool, _last_fired_unix_ms: Option<i64>) -> Fut<'_, Result<(), HubError>> {
        Box::pin(async { Ok(()) })
    }

    fn list_non_paused_systems(&self) -> Fut<'_, Result<Vec<System>, HubError>> {
        let systems = self.systems.lock().unwrap().clone();
        Box::pin(async move { Ok(systems) })
    }

    fn fingerprints_for_token(&self, _token: &str) -> Fut<'_, Result<Vec<crate::model::Fingerprint>, HubError>> {
        Box::pin(async { Ok(vec![]) })
    }

    fn create_system(&self, system: System, _fingerprint: crate::model::Fingerprint) -> Fut<'_, Result<(), HubError>> {
        self.systems.lock().unwrap().push(system);
        Box::pin(async { Ok(()) })
    }

    fn save_fingerprint(&self, _fingerprint: &crate::model::Fingerprint) -> Fut<'_, Result<(), HubError>> {
        Box::pin(async { Ok(()) })
    }

    fn has_any_users(&self) -> Fut<'_, Result<bool, HubError>> {
        Box::pin(async { Ok(true) })
    }

    fn create_first_user(&self, _payload: serde_json::Value) -> Fut<'_, Result<(), HubError>> {
        Box::pin(async { Ok(()) })
    }

    fn dump_config_yaml(&self) -> Fut<'_, Result<String, HubError>> {
        Box::pin(async { Ok(String::new()) })
    }
}

/// No-op [`Transport`] stand-in for tests that only need a system state to
/// already have *some* transport attached.
struct FakeTransport;

impl Transport for FakeTransport {
    fn request_data(&self, _deadline: Duration) -> Fut<'_, Result<CombinedData, HubError>> {
        Box::pin(async { Err(HubError::TransportTimeout) })
    }

    fn close(&self) -> Fut<'_, ()> {
        Box::pin(async {})
    }

    fn is_alive(&self) -> bool {
        true
    }
}

async fn test_identity() -> Arc<Identity> {
    let dir = tempfile::tempdir().expect("tempdir");
    Identity::load_or_create(dir.path()).await.expect("identity")
}

fn test_system(id: &str, host: &str) -> System {
    System::new(id.to_owned(), "box".to_owned(), host.to_owned(), 45876, vec!["u1".to_owned()])
}

#[tokio::test]
async fn remove_system_is_idempotent_and_reports_not_found_twice() {
    let config = HubConfig::for_test();
    let identity = test_identity().await;
    let store: Arc<dyn Store> = Arc::new(FakeStore::default());
    let manager = SystemManager::new(config, identity, store, CancellationToken::new());

    manager.add_record(test_system("sys-1", "10.0.0.5")).await.expect("add record");

    manager.remove_system("sys-1").await.expect("first remove succeeds");
    let second = manager.remove_system("sys-1").await;
    assert!(matches!(second, Err(HubError::SystemNotFound)));
}

#[tokio::test]
async fn add_record_rejects_empty_host() {
    let config = HubConfig::for_test();
    let identity = test_identity().await;
    let store: Arc<dyn Store> = Arc::new(FakeStore::default());
    let manager = SystemManager::new(config, identity, store, CancellationToken::new());

    let result = manager.add_record(test_system("sys-2", "")).await;
    assert!(matches!(result, Err(HubError::BadRequest)));
}

#[tokio::test]
async fn set_status_paused_clears_transport_and_last_data() {
    let config = HubConfig::for_test();
    let identity = test_identity().await;
    let store: Arc<dyn Store> = Arc::new(FakeStore::default());
    let manager = SystemManager::new(config, identity, store, CancellationToken::new());

    manager.add_record(test_system("sys-3", "10.0.0.6")).await.expect("add record");

    {
        let snapshot = manager.snapshot().await;
        let state = snapshot.iter().find(|s| s.id == "sys-3").expect("tracked");
        *state.transport.write().await = Some(Arc::new(FakeTransport));
        *state.last_data.write().await = Some(sample_combined_data());
    }

    manager.set_status("sys-3", SystemStatus::Paused).await.expect("pause");

    let snapshot = manager.snapshot().await;
    let state = snapshot.iter().find(|s| s.id == "sys-3").expect("tracked");
    assert_eq!(*state.status.read().await, SystemStatus::Paused);
    assert!(state.transport.read().await.is_none());
    assert!(state.last_data.read().await.is_none());
}

#[tokio::test]
async fn add_websocket_system_creates_new_tracked_state() {
    let config = HubConfig::for_test();
    let identity = test_identity().await;
    let store: Arc<dyn Store> = Arc::new(FakeStore::default());
    let manager = SystemManager::new(config, identity, store, CancellationToken::new());

    let transport: Arc<dyn Transport> = Arc::new(FakeTransport);
    let version = semver::Version::parse("0.12.0").unwrap();
    manager.add_websocket_system("sys-4".to_owned(), version, transport).await.expect("bind");

    let snapshot = manager.snapshot().await;
    let state = snapshot.iter().find(|s| s.id == "sys-4").expect("tracked");
    assert_eq!(state.kind, TransportKind::WebSocket);
    assert!(state.transport.read().await.is_some());
}

#[tokio::test]
async fn force_reconnect_closes_websocket_and_marks_down() {
    let config = HubConfig::for_test();
    let identity = test_identity().await;
    let store: Arc<dyn Store> = Arc::new(FakeStore::default());
    let manager = SystemManager::new(config, identity, store, CancellationToken::new());

    let transport: Arc<dyn Transport> = Arc::new(FakeTransport);
    let version = semver::Version::parse("0.12.0").unwrap();
    manager.add_websocket_system("sys-5".to_owned(), version, transport).await.expect("bind");
    manager.set_status("sys-5", SystemStatus::Up).await.expect("mark up");

    manager.force_reconnect("sys-5").await.expect("force reconnect");

    let snapshot = manager.snapshot().await;
    let state = snapshot.iter().find(|s| s.id == "sys-5").expect("tracked");
    assert_eq!(*state.status.read().await, SystemStatus::Down);
    assert!(state.transport.read().await.is_none());
}

#[tokio::test]
async fn force_reconnect_reports_not_found_for_unknown_system() {
    let config = HubConfig::for_test();
    let identity = test_identity().await;
    let store: Arc<dyn Store> = Arc::new(FakeStore::default());
    let manager = SystemManager::new(config, identity, store, CancellationToken::new());

    let result = manager.force_reconnect("missing").await;
    assert!(matches!(result, Err(HubError::SystemNotFound)));
}

fn sample_combined_data() -> CombinedData {
    CombinedData {
        info: Info {
            hostname: "box".to_owned(),
            kernel: "6.1".to_owned(),
            cores: 1,
            threads: 1,
            uptime_secs: 1,
            agent_version: "0.12.0".to_owned(),
            connection_type: crate::model::ConnectionType::Ssh,
            gauges: serde_json::json!({}),
        },
        stats: crate::model::Stats {
            cpu_pct: 1.0,
            mem_pct: 1.0,
            disk_pct: 1.0,
            net_rx_bytes: 0,
            net_tx_bytes: 0,
            temperatures: serde_json::json!({}),
            gpus: serde_json::json!({}),
            load_avg: [0.0, 0.0, 0.0],
        },
        containers: vec![],
    }
}
