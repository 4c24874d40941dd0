// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concrete value types shared across the enrolment, transport, and manager layers.

use serde::{Deserialize, Serialize};

/// The default SSH port an agent is assumed to listen on when it does not report one.
pub const DEFAULT_AGENT_PORT: &str = "45876";

/// Stable identifier for a monitored system.
pub type SystemId = String;

/// Stable identifier for a record-store user.
pub type UserId = String;

/// Current lifecycle status of a monitored system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Pending,
    Up,
    Down,
    Paused,
}

/// How the hub reaches a system: outbound SSH poll or an accepted WebSocket push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Ssh,
    WebSocket,
}

/// One monitored host, as persisted by the record store.
///
/// `id` is set once at construction and never reassigned; there is no setter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct System {
    id: SystemId,
    pub name: String,
    /// IP, hostname, or a `/`-prefixed filesystem path to a UNIX domain socket.
    pub host: String,
    /// Ignored when `host` is a UNIX socket path.
    pub port: u16,
    pub status: SystemStatus,
    /// Cleared on transition to `Paused`.
    pub info: Option<Info>,
    /// Ordered; a system always has at least one owner.
    pub owner_user_ids: Vec<UserId>,
}

impl System {
    pub fn new(id: SystemId, name: String, host: String, port: u16, owner_user_ids: Vec<UserId>) -> Self {
        debug_assert!(!owner_user_ids.is_empty(), "a system must have at least one owner");
        Self { id, name, host, port, status: SystemStatus::Pending, info: None, owner_user_ids }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_unix_socket(&self) -> bool {
        self.host.starts_with('/')
    }
}

/// Structured metadata reported by the agent, persisted onto the system row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    pub hostname: String,
    pub kernel: String,
    pub cores: u32,
    pub threads: u32,
    pub uptime_secs: u64,
    pub agent_version: String,
    pub connection_type: ConnectionType,
    /// Latest cached gauges, kept opaque since the core never reads into them.
    #[serde(default)]
    pub gauges: serde_json::Value,
}

/// One minute's numeric sample from an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub cpu_pct: f64,
    pub mem_pct: f64,
    pub disk_pct: f64,
    pub net_rx_bytes: u64,
    pub net_tx_bytes: u64,
    #[serde(default)]
    pub temperatures: serde_json::Value,
    #[serde(default)]
    pub gpus: serde_json::Value,
    #[serde(default)]
    pub load_avg: [f64; 3],
}

/// One container's sample, nested inside [`CombinedData`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerStats {
    pub name: String,
    pub cpu_pct: f64,
    pub mem_bytes: u64,
    #[serde(default)]
    pub net_rx_bytes: u64,
    #[serde(default)]
    pub net_tx_bytes: u64,
}

/// The full payload returned by one agent sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedData {
    pub info: Info,
    pub stats: Stats,
    #[serde(default)]
    pub containers: Vec<ContainerStats>,
}

/// Coarse-bucket tag attached to a persisted stats row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    #[serde(rename = "1m")]
    OneMin,
    #[serde(rename = "10m")]
    TenMin,
    #[serde(rename = "20m")]
    TwentyMin,
    #[serde(rename = "120m")]
    OneTwentyMin,
    #[serde(rename = "480m")]
    FourEightyMin,
}

/// Append-only time-series row for system-level stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatsRecord {
    pub system_id: SystemId,
    pub bucket: Bucket,
    pub stats: Stats,
    pub created_unix_ms: i64,
}

/// Append-only time-series row for one container's stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerStatsRecord {
    pub system_id: SystemId,
    pub bucket: Bucket,
    pub stats: ContainerStats,
    pub created_unix_ms: i64,
}

/// Binds an agent identity to a system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    pub id: String,
    pub system_id: SystemId,
    /// Opaque, ASCII, at most 64 bytes.
    pub token: String,
    /// Empty until the agent's first successful connection.
    pub fingerprint: String,
}

impl Fingerprint {
    pub fn is_bound(&self) -> bool {
        !self.fingerprint.is_empty()
    }
}

/// The agent's reply to a `CheckFingerprint` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintResponse {
    pub fingerprint: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
}

/// Out-of-core push from the hub, tolerated by the framing layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigUpdateRequest {
    #[serde(default)]
    pub yaml: serde_json::Value,
}

/// Alert metric kind, as configured by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Cpu,
    Memory,
    Disk,
    Network,
    Temperature,
    Status,
}

/// Comparator applied between the observed metric and the alert threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
}

/// A user-defined alert rule attached to a system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub system_id: SystemId,
    pub kind: AlertKind,
    pub comparator: Comparator,
    pub threshold: f64,
    pub minutes_sustained: u32,
    pub triggered: bool,
    pub last_fired_unix_ms: Option<i64>,
}
