// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn unix_socket_hosts_are_detected_by_leading_slash() {
    assert!(is_unix_socket_host("/var/run/beszel-agent.sock"));
    assert!(!is_unix_socket_host("192.168.1.100"));
    assert!(!is_unix_socket_host("box-a.local"));
}

#[tokio::test]
async fn fresh_transport_reports_alive_before_any_poll() {
    let identity = Arc::new(
        russh::keys::PrivateKey::random(
            &mut russh::keys::ssh_key::rand_core::OsRng,
            russh::keys::Algorithm::Ed25519,
        )
        .expect("keygen"),
    );
    let transport = SshTransport::new(
        "192.0.2.1".to_owned(),
        45876,
        identity,
        Duration::from_millis(50),
        Duration::from_millis(50),
    );
    assert!(transport.is_alive());
}
