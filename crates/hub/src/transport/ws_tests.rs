// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::{ConnectionType, Info};

fn sample_combined_data() -> CombinedData {
    CombinedData {
        info: Info {
            hostname: "box-a".to_owned(),
            kernel: "6.1".to_owned(),
            cores: 4,
            threads: 8,
            uptime_secs: 100,
            agent_version: "0.12.0".to_owned(),
            connection_type: ConnectionType::WebSocket,
            gauges: serde_json::json!({}),
        },
        stats: crate::model::Stats {
            cpu_pct: 12.5,
            mem_pct: 40.0,
            disk_pct: 55.0,
            net_rx_bytes: 0,
            net_tx_bytes: 0,
            temperatures: serde_json::json!({}),
            gpus: serde_json::json!({}),
            load_avg: [0.1, 0.2, 0.3],
        },
        containers: vec![],
    }
}

#[tokio::test]
async fn request_data_times_out_with_no_responder() {
    let (transport, _rx) = WsTransport::new_for_test();
    let result = transport.request_data(Duration::from_millis(20)).await;
    assert!(matches!(result, Err(HubError::TransportTimeout)));
}

#[tokio::test]
async fn request_data_resolves_when_response_frame_arrives() {
    let (transport, mut rx) = WsTransport::new_for_test();
    let data = sample_combined_data();

    let request = tokio::spawn({
        let transport = Arc::clone(&transport);
        async move { transport.request_data(Duration::from_secs(5)).await }
    });

    // Simulate the pump: the outgoing GetData frame must appear on the wire...
    let outgoing = rx.recv().await.expect("outgoing frame queued");
    let sent = frame::decode(&outgoing).expect("valid frame");
    assert_eq!(sent.action, FrameAction::GetData);

    // ...and the agent's CombinedData reply completes the pending slot.
    let reply = frame::encode(FrameAction::CombinedData, &data).expect("encode reply");
    let decoded = frame::decode(&reply).expect("decode reply");
    transport.complete_pending(decoded).await;

    let result = request.await.expect("task joined");
    assert_eq!(result.expect("ok").info.hostname, "box-a");
}

#[tokio::test]
async fn request_data_rejects_wrong_action_as_protocol_violation() {
    let (transport, mut rx) = WsTransport::new_for_test();

    let request = tokio::spawn({
        let transport = Arc::clone(&transport);
        async move { transport.request_data(Duration::from_secs(5)).await }
    });

    let _ = rx.recv().await.expect("outgoing frame queued");

    let wrong = frame::encode(FrameAction::ConfigUpdate, &serde_json::json!({})).expect("encode");
    let decoded = frame::decode(&wrong).expect("decode");
    transport.complete_pending(decoded).await;

    let result = request.await.expect("task joined");
    assert!(matches!(result, Err(HubError::ProtocolViolation)));
}

#[tokio::test]
async fn concurrent_callers_serialize_through_one_in_flight_request() {
    let (transport, mut rx) = WsTransport::new_for_test();
    let data = sample_combined_data();

    let t1 = Arc::clone(&transport);
    let first = tokio::spawn(async move { t1.request_data(Duration::from_secs(5)).await });

    // First caller's GetData goes out immediately.
    let outgoing = rx.recv().await.expect("first outgoing frame");
    assert_eq!(frame::decode(&outgoing).expect("decode").action, FrameAction::GetData);

    let t2 = Arc::clone(&transport);
    let second = tokio::spawn(async move { t2.request_data(Duration::from_secs(5)).await });

    // Second caller must block on `request_lock` until the first completes,
    // so nothing new is queued yet.
    assert!(tokio::time::timeout(Duration::from_millis(20), rx.recv()).await.is_err());

    let reply = frame::encode(FrameAction::CombinedData, &data).expect("encode");
    transport.complete_pending(frame::decode(&reply).expect("decode")).await;
    first.await.expect("joined").expect("first ok");

    // Now the second caller's own GetData is free to go out.
    let outgoing = rx.recv().await.expect("second outgoing frame");
    assert_eq!(frame::decode(&outgoing).expect("decode").action, FrameAction::GetData);
    let reply = frame::encode(FrameAction::CombinedData, &data).expect("encode");
    transport.complete_pending(frame::decode(&reply).expect("decode")).await;
    second.await.expect("joined").expect("second ok");
}
