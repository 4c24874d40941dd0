// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the fleet hub.
#[derive(Debug, Clone, clap::Args)]
pub struct HubConfig {
    /// Host to bind the HTTP/WebSocket listener on.
    #[arg(long, default_value = "0.0.0.0", env = "HUB_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8090, env = "HUB_PORT")]
    pub port: u16,

    /// Directory holding the signing keypair and any other on-disk state.
    #[arg(long, default_value = "./hub_data", env = "HUB_DATA_DIR")]
    pub data_dir: std::path::PathBuf,

    /// Per-system poll interval in milliseconds (SSH and WebSocket updaters).
    #[arg(long, default_value_t = 60_000, env = "HUB_POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,

    /// SSH aggregate sweeper tick interval in milliseconds.
    #[arg(long, default_value_t = 15_000, env = "HUB_SWEEP_INTERVAL_MS")]
    pub sweep_interval_ms: u64,

    /// Systems updated more recently than this are excluded from a sweep batch.
    #[arg(long, default_value_t = 50_000, env = "HUB_SWEEP_WINDOW_MS")]
    pub sweep_window_ms: u64,

    /// Universal enrolment token time-to-live in milliseconds.
    #[arg(long, default_value_t = 3_600_000, env = "HUB_UNIVERSAL_TOKEN_TTL_MS")]
    pub universal_token_ttl_ms: u64,

    /// SSH dial (TCP connect + handshake) timeout in milliseconds.
    #[arg(long, default_value_t = 4_000, env = "HUB_SSH_DIAL_TIMEOUT_MS")]
    pub ssh_dial_timeout_ms: u64,

    /// SSH session-open timeout in milliseconds.
    #[arg(long, default_value_t = 4_000, env = "HUB_SSH_SESSION_TIMEOUT_MS")]
    pub ssh_session_timeout_ms: u64,

    /// Per-request deadline (SSH session wait / WebSocket round trip) in milliseconds.
    #[arg(long, default_value_t = 10_000, env = "HUB_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Public base URL the hub is reachable at (used by the self-update / UI boundary).
    #[arg(long, env = "APP_URL")]
    pub app_url: Option<String>,

    /// Disable password authentication for the web UI (external, consumed by the record store).
    #[arg(long, default_value_t = false, env = "DISABLE_PASSWORD_AUTH")]
    pub disable_password_auth: bool,

    /// Allow self-service account creation for the web UI.
    #[arg(long, default_value_t = false, env = "USER_CREATION")]
    pub user_creation: bool,

    /// Share all systems with every user by default.
    #[arg(long, default_value_t = false, env = "SHARE_ALL_SYSTEMS")]
    pub share_all_systems: bool,

    /// Content-Security-Policy header value served with the web UI.
    #[arg(long, env = "CSP")]
    pub csp: Option<String>,
}

impl HubConfig {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn sweep_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sweep_window_ms)
    }

    pub fn universal_token_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.universal_token_ttl_ms)
    }

    pub fn ssh_dial_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ssh_dial_timeout_ms)
    }

    pub fn ssh_session_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ssh_session_timeout_ms)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }

    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 0,
            data_dir: std::path::PathBuf::from("./hub_data_test"),
            poll_interval_ms: 60_000,
            sweep_interval_ms: 15_000,
            sweep_window_ms: 50_000,
            universal_token_ttl_ms: 3_600_000,
            ssh_dial_timeout_ms: 4_000,
            ssh_session_timeout_ms: 4_000,
            request_timeout_ms: 10_000,
            app_url: None,
            disable_password_auth: false,
            user_creation: false,
            share_all_systems: false,
            csp: None,
        }
    }
}
