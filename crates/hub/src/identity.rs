// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hub's long-lived Ed25519 identity, usable as both an SSH client key
//! (outbound polling) and an SSH server key (inbound, not currently exposed).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use russh::keys::ssh_key::{LineEnding, PrivateKey};
use tokio::sync::OnceCell;

use crate::error::HubError;

const PRIVATE_KEY_FILE: &str = "hub_id_ed25519";
const PUBLIC_KEY_FILE: &str = "hub_id_ed25519.pub";

/// The hub's signing identity, cached for the lifetime of the process.
///
/// Construction is gated behind a [`OnceCell`] so concurrent early callers
/// during startup never race to generate two keypairs.
pub struct Identity {
    key: PrivateKey,
}

impl Identity {
    /// Return the cached identity, generating and persisting one on first call.
    pub async fn load_or_create(data_dir: &Path) -> Result<Arc<Self>, HubError> {
        static CELL: OnceCell<Arc<Identity>> = OnceCell::const_new();
        CELL.get_or_try_init(|| async { Self::load_or_create_uncached(data_dir).await })
            .await
            .cloned()
    }

    async fn load_or_create_uncached(data_dir: &Path) -> Result<Arc<Self>, HubError> {
        let private_path = data_dir.join(PRIVATE_KEY_FILE);
        let public_path = data_dir.join(PUBLIC_KEY_FILE);

        if private_path.exists() {
            let key = load_private_key(&private_path)?;
            return Ok(Arc::new(Self { key }));
        }

        let key = PrivateKey::random(&mut rand_core_os_rng(), russh::keys::Algorithm::Ed25519)
            .map_err(|_| HubError::KeyIoError)?;
        write_keypair_atomically(data_dir, &private_path, &public_path, &key)?;
        Ok(Arc::new(Self { key }))
    }

    /// Signer usable to authenticate outbound SSH dials to agents.
    pub fn client_key(&self) -> &PrivateKey {
        &self.key
    }

    /// Signer usable to authenticate inbound SSH connections, should the hub
    /// ever accept them directly (currently unused: agents connect over
    /// WebSocket when not SSH-polled).
    pub fn server_key(&self) -> &PrivateKey {
        &self.key
    }

    /// The `authorized_keys`-format line for this identity's public half,
    /// served to the UI so agents can be configured out-of-band.
    pub fn authorized_keys_line(&self) -> Result<String, HubError> {
        self.key.public_key().to_openssh().map_err(|_| HubError::KeyIoError)
    }
}

fn rand_core_os_rng() -> impl rand_core_shim::CryptoRngCore {
    rand_core_shim::OsRng
}

/// Thin indirection so the RNG source used by key generation is named once.
mod rand_core_shim {
    pub use russh::keys::ssh_key::rand_core::{CryptoRngCore, OsRng};
}

fn load_private_key(path: &Path) -> Result<PrivateKey, HubError> {
    let pem = std::fs::read_to_string(path).map_err(|_| HubError::KeyIoError)?;
    PrivateKey::from_openssh(&pem).map_err(|_| HubError::KeyIoError)
}

fn write_keypair_atomically(
    data_dir: &Path,
    private_path: &Path,
    public_path: &Path,
    key: &PrivateKey,
) -> Result<(), HubError> {
    std::fs::create_dir_all(data_dir).map_err(|_| HubError::KeyIoError)?;

    let pem = key.to_openssh(LineEnding::LF).map_err(|_| HubError::KeyIoError)?;
    let authorized_line =
        key.public_key().to_openssh().map_err(|_| HubError::KeyIoError)?;

    write_owner_only(private_path, pem.as_str())?;
    write_owner_only(public_path, &format!("{authorized_line}\n"))?;
    Ok(())
}

/// Write `contents` to a temp file in the same directory, setting owner-only
/// permissions before the final rename so the key is never briefly
/// world-readable.
fn write_owner_only(final_path: &Path, contents: &str) -> Result<(), HubError> {
    let dir = final_path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path: PathBuf = dir.join(format!(
        ".{}.tmp",
        final_path.file_name().and_then(|n| n.to_str()).unwrap_or("key")
    ));

    std::fs::write(&tmp_path, contents).map_err(|_| HubError::KeyIoError)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
            .map_err(|_| HubError::KeyIoError)?;
    }

    std::fs::rename(&tmp_path, final_path).map_err(|_| HubError::KeyIoError)?;
    Ok(())
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
