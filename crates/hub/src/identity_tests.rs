// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn generates_and_persists_keypair_on_first_start() {
    let dir = tempfile::tempdir().expect("tempdir");
    let identity = Identity::load_or_create_uncached(dir.path()).await.expect("identity");

    assert!(dir.path().join(PRIVATE_KEY_FILE).exists());
    assert!(dir.path().join(PUBLIC_KEY_FILE).exists());
    assert!(identity.authorized_keys_line().expect("line").starts_with("ssh-ed25519"));
}

#[tokio::test]
async fn reloads_same_key_on_second_start() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = Identity::load_or_create_uncached(dir.path()).await.expect("identity");
    let second = Identity::load_or_create_uncached(dir.path()).await.expect("identity");

    assert_eq!(
        first.authorized_keys_line().expect("line"),
        second.authorized_keys_line().expect("line"),
    );
}

#[cfg(unix)]
#[tokio::test]
async fn private_key_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let _identity = Identity::load_or_create_uncached(dir.path()).await.expect("identity");

    let meta = std::fs::metadata(dir.path().join(PRIVATE_KEY_FILE)).expect("metadata");
    assert_eq!(meta.permissions().mode() & 0o777, 0o600);
}
