// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translates record-store lifecycle events into [`crate::manager`]
//! operations, and exposes the manager's persistence needs back to the
//! store. These two traits are the only coupling between the manager and
//! the embedded record store; every other read or write goes through the
//! manager's own API.

use std::future::Future;
use std::pin::Pin;

use crate::error::HubError;
use crate::model::{Alert, ContainerStatsRecord, Fingerprint, Info, System, SystemId, SystemStatsRecord};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Hooks the record store is expected to call as rows move through their
/// lifecycle. Implementations live outside the core; the manager only
/// consumes them through [`crate::manager::SystemManager`]'s own methods,
/// which these hooks should delegate to.
pub trait StoreHooks: Send + Sync {
    /// A `systems` row is about to be created; populate default `status`/`info`.
    fn before_create(&self, system: &mut System);

    /// A `systems` row was created; begin monitoring it.
    /// Implementations should call [`crate::manager::SystemManager::add_record`].
    fn after_create(&self, system: System) -> BoxFuture<'_, Result<(), HubError>>;

    /// A `systems` row is about to be updated; clear `info` if transitioning to paused.
    fn before_update(&self, system: &mut System);

    /// A `systems` row was updated; apply the transition (pause/resume/etc).
    /// Implementations should call [`crate::manager::SystemManager::add_record`],
    /// which replaces any already-tracked state for the same id.
    fn after_update(&self, system: System) -> BoxFuture<'_, Result<(), HubError>>;

    /// A `systems` row was deleted; remove it from the manager.
    /// Implementations should call [`crate::manager::SystemManager::remove_system`].
    fn after_delete(&self, id: &str) -> BoxFuture<'_, Result<(), HubError>>;

    /// A `fingerprints` row's token changed; force a reconnect if connected.
    /// Implementations should call [`crate::manager::SystemManager::force_reconnect`]
    /// with the fingerprint's `system_id`.
    fn on_fingerprint_updated(&self, fingerprint: &Fingerprint) -> BoxFuture<'_, Result<(), HubError>>;
}

/// Persistence calls the manager makes into the record store. Implementations
/// live outside the core; this is the only way the manager writes durable state.
pub trait Store: Send + Sync {
    fn save_system(&self, system: &System) -> BoxFuture<'_, Result<(), HubError>>;

    /// Update a system's reported `info` and status in place, leaving its
    /// name and ownership untouched. Narrower than [`Store::save_system`]
    /// because the updater only ever learns the agent-reported half of a
    /// system row, never its ownership.
    fn update_info(
        &self,
        system_id: &SystemId,
        status: crate::model::SystemStatus,
        info: Info,
    ) -> BoxFuture<'_, Result<(), HubError>>;

    fn append_system_stats_row(&self, row: SystemStatsRecord) -> BoxFuture<'_, Result<(), HubError>>;

    fn append_container_stats_row(
        &self,
        row: ContainerStatsRecord,
    ) -> BoxFuture<'_, Result<(), HubError>>;

    fn clear_triggered_alerts(&self, system_id: &SystemId) -> BoxFuture<'_, Result<(), HubError>>;

    /// Persist an alert's new `triggered` state and, when it just fired,
    /// `last_fired_unix_ms`. Called once per poll for every alert whose
    /// breach state changed; never called for alerts that stayed the same.
    fn set_alert_triggered(
        &self,
        alert_id: &str,
        triggered: bool,
        last_fired_unix_ms: Option<i64>,
    ) -> BoxFuture<'_, Result<(), HubError>>;

    fn alerts_for_system(&self, system_id: &SystemId) -> BoxFuture<'_, Result<Vec<Alert>, HubError>>;

    fn list_non_paused_systems(&self) -> BoxFuture<'_, Result<Vec<System>, HubError>>;

    /// All fingerprint rows currently keyed by `token`. More than one row
    /// shares a token only when the token is universal.
    fn fingerprints_for_token(&self, token: &str) -> BoxFuture<'_, Result<Vec<Fingerprint>, HubError>>;

    /// Create a new system row and its paired (initially empty-fingerprint)
    /// fingerprint row as a single enrolment transaction.
    fn create_system(&self, system: System, fingerprint: Fingerprint) -> BoxFuture<'_, Result<(), HubError>>;

    /// Persist a fingerprint row whose `fingerprint` field was just bound or
    /// updated (first contact, or via `on_fingerprint_updated` on rotation).
    fn save_fingerprint(&self, fingerprint: &Fingerprint) -> BoxFuture<'_, Result<(), HubError>>;

    /// Whether any `users` row exists yet. Backs `GET /api/beszel/first-run`
    /// and gates `POST /api/beszel/create-user`; ownership of the `users`
    /// collection itself is the record store's, not the core's.
    fn has_any_users(&self) -> BoxFuture<'_, Result<bool, HubError>>;

    /// Create the first user account. The store owns validation (password
    /// policy, uniqueness); the core only enforces that this is unreachable
    /// once `has_any_users` is true.
    fn create_first_user(&self, payload: serde_json::Value) -> BoxFuture<'_, Result<(), HubError>>;

    /// Serialized YAML configuration dump for the admin-only export
    /// endpoint. Content and schema are the record store's concern; the
    /// core only wires the route.
    fn dump_config_yaml(&self) -> BoxFuture<'_, Result<String, HubError>>;
}

/// Registers the two scheduled jobs the store's cron facility is expected to
/// drive. The core exposes only the hook; retention windows and aggregation
/// rules are the job implementation's responsibility, not the core's.
pub trait ScheduledJobs: Send + Sync {
    /// Register a closure to run at the top of every hour (retention pruning).
    fn register_hourly(&self, job: Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>);

    /// Register a closure to run every 10 minutes (coarse-bucket aggregation).
    fn register_every_ten_minutes(&self, job: Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>);
}
