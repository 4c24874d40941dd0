// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::ConnectionType;

fn sample_info() -> Info {
    Info {
        hostname: "box".to_owned(),
        kernel: "6.1".to_owned(),
        cores: 4,
        threads: 8,
        uptime_secs: 10,
        agent_version: "0.5.0".to_owned(),
        connection_type: ConnectionType::Ssh,
        gauges: serde_json::Value::Null,
    }
}

#[tokio::test]
async fn update_info_rejects_unknown_system() {
    let store = InMemoryStore::new();
    let result = store.update_info(&"missing".to_owned(), SystemStatus::Up, sample_info()).await;
    assert!(matches!(result, Err(HubError::SystemNotFound)));
}

#[tokio::test]
async fn update_info_preserves_name_and_owners() {
    let store = InMemoryStore::new();
    let system = System::new("sys-1".to_owned(), "box-a".to_owned(), "10.0.0.1".to_owned(), 45876, vec!["u1".to_owned()]);
    store.save_system(&system).await.unwrap();

    store.update_info(&"sys-1".to_owned(), SystemStatus::Up, sample_info()).await.unwrap();

    let systems = store.list_non_paused_systems().await.unwrap();
    assert_eq!(systems.len(), 1);
    assert_eq!(systems[0].name, "box-a");
    assert_eq!(systems[0].status, SystemStatus::Up);
    assert!(systems[0].info.is_some());
}

#[tokio::test]
async fn list_non_paused_systems_excludes_paused() {
    let store = InMemoryStore::new();
    let mut paused = System::new("sys-2".to_owned(), "box-b".to_owned(), "10.0.0.2".to_owned(), 45876, vec!["u1".to_owned()]);
    paused.status = SystemStatus::Paused;
    store.save_system(&paused).await.unwrap();

    assert!(store.list_non_paused_systems().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_system_persists_both_rows() {
    let store = InMemoryStore::new();
    let system = System::new("sys-3".to_owned(), "box-c".to_owned(), "10.0.0.3".to_owned(), 45876, vec!["u1".to_owned()]);
    let fingerprint = Fingerprint { id: "fp-1".to_owned(), system_id: "sys-3".to_owned(), token: "T1".to_owned(), fingerprint: String::new() };

    store.create_system(system, fingerprint).await.unwrap();

    let rows = store.fingerprints_for_token("T1").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].system_id, "sys-3");
}

#[tokio::test]
async fn set_alert_triggered_updates_flag_and_timestamp() {
    let store = InMemoryStore::new();
    store.seed_alert(Alert {
        id: "alert-9".to_owned(),
        system_id: "sys-9".to_owned(),
        kind: crate::model::AlertKind::Cpu,
        comparator: crate::model::Comparator::GreaterThan,
        threshold: 80.0,
        minutes_sustained: 0,
        triggered: false,
        last_fired_unix_ms: None,
    });

    store.set_alert_triggered("alert-9", true, Some(1_000)).await.unwrap();

    let alerts = store.alerts_for_system(&"sys-9".to_owned()).await.unwrap();
    assert!(alerts[0].triggered);
    assert_eq!(alerts[0].last_fired_unix_ms, Some(1_000));
}

#[tokio::test]
async fn set_alert_triggered_rejects_unknown_alert() {
    let store = InMemoryStore::new();
    let result = store.set_alert_triggered("missing", true, None).await;
    assert!(matches!(result, Err(HubError::AlertNotFound)));
}

#[tokio::test]
async fn first_user_flips_has_any_users() {
    let store = InMemoryStore::new();
    assert!(!store.has_any_users().await.unwrap());
    store.create_first_user(serde_json::json!({"username": "admin"})).await.unwrap();
    assert!(store.has_any_users().await.unwrap());
}
