// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-system updater: one task per tracked system, ticking on the
//! configured poll interval and driving its [`SystemState`] through
//! dial/poll/persist/alert on every tick.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::error::HubError;
use crate::manager::{SystemManager, SystemState, TransportKind};
use crate::model::{Bucket, CombinedData, Comparator, SystemStatus};
use crate::transport::ssh::SshTransport;
use crate::transport::Transport;

/// Drive one system's lifecycle until its cancellation token fires.
///
/// `initial_delay` staggers first polls across a fleet; everything after
/// that runs on a fixed ticker at `manager.config().poll_interval()`.
pub async fn run(manager: Arc<SystemManager>, state: Arc<SystemState>, initial_delay: Duration) {
    if initial_delay > Duration::ZERO {
        tokio::select! {
            _ = tokio::time::sleep(initial_delay) => {}
            _ = state.cancel.cancelled() => return,
        }
    }

    let mut ticker = tokio::time::interval(manager.config().poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await; // first tick fires immediately; consume it before the loop

    poll_once(&manager, &state).await;

    loop {
        tokio::select! {
            _ = state.cancel.cancelled() => return,
            _ = ticker.tick() => poll_once(&manager, &state).await,
        }
    }
}

/// Run one poll/persist/alert cycle outside the system's own ticker.
///
/// Used by [`crate::manager::sweeper`] to nudge systems that have fallen
/// stale without disturbing their regular per-system schedule.
pub async fn poll_now(manager: &Arc<SystemManager>, state: &Arc<SystemState>) {
    poll_once(manager, state).await;
}

async fn poll_once(manager: &Arc<SystemManager>, state: &Arc<SystemState>) {
    if state.transport.read().await.is_none() {
        match state.kind {
            TransportKind::WebSocket => return, // agent connects on its own schedule
            TransportKind::Ssh => {
                if let Err(err) = attach_ssh_transport(manager, state).await {
                    tracing::debug!(system = %state.id, err = %err, "ssh dial failed");
                    mark_down(manager, state).await;
                    return;
                }
            }
        }
    }

    let deadline = manager.config().request_timeout();
    let transport = state.transport.read().await.as_ref().map(Arc::clone);
    let Some(transport) = transport else { return };

    match transport.request_data(deadline).await {
        Ok(data) => on_success(manager, state, data).await,
        Err(HubError::BadClient) if state.kind == TransportKind::Ssh => {
            *state.transport.write().await = None;
            match attach_ssh_transport(manager, state).await {
                Ok(()) => {
                    let retried = state.transport.read().await.as_ref().map(Arc::clone);
                    match retried {
                        Some(transport) => match transport.request_data(deadline).await {
                            Ok(data) => on_success(manager, state, data).await,
                            Err(_) => mark_down(manager, state).await,
                        },
                        None => mark_down(manager, state).await,
                    }
                }
                Err(_) => mark_down(manager, state).await,
            }
        }
        Err(_) => mark_down(manager, state).await,
    }
}

/// Attach a fresh [`SshTransport`] shell to `state`. Does not itself dial:
/// the transport dials lazily on its first `request_data` call.
async fn attach_ssh_transport(manager: &Arc<SystemManager>, state: &Arc<SystemState>) -> Result<(), HubError> {
    let host = state.host.read().await.clone();
    let port = *state.port.read().await;
    let identity = Arc::new(manager.identity().client_key().clone());

    let transport = Arc::new(SshTransport::new(
        host,
        port,
        identity,
        manager.config().ssh_dial_timeout(),
        manager.config().ssh_session_timeout(),
    ));
    *state.transport.write().await = Some(transport);
    Ok(())
}

async fn on_success(manager: &Arc<SystemManager>, state: &Arc<SystemState>, data: CombinedData) {
    state.retry_count.store(0, Ordering::Relaxed);

    let now_ms = unix_ms_now();
    *state.last_data.write().await = Some(data.clone());
    *state.last_persisted_at.write().await = Some(std::time::Instant::now());

    set_status_if_changed(manager, state, SystemStatus::Up).await;

    if let Err(err) = manager.store().update_info(&state.id, SystemStatus::Up, data.info.clone()).await {
        tracing::warn!(system = %state.id, err = %err, "failed to persist system info");
    }

    let stats_row = crate::model::SystemStatsRecord {
        system_id: state.id.clone(),
        bucket: Bucket::OneMin,
        stats: data.stats.clone(),
        created_unix_ms: now_ms,
    };
    if let Err(err) = manager.store().append_system_stats_row(stats_row).await {
        tracing::warn!(system = %state.id, err = %err, "failed to append stats row");
    }

    for container in &data.containers {
        let row = crate::model::ContainerStatsRecord {
            system_id: state.id.clone(),
            bucket: Bucket::OneMin,
            stats: container.clone(),
            created_unix_ms: now_ms,
        };
        if let Err(err) = manager.store().append_container_stats_row(row).await {
            tracing::warn!(system = %state.id, err = %err, "failed to append container stats row");
        }
    }

    evaluate_alerts(manager, state, &data, now_ms).await;
}

async fn mark_down(manager: &Arc<SystemManager>, state: &Arc<SystemState>) {
    state.retry_count.fetch_add(1, Ordering::Relaxed);
    set_status_if_changed(manager, state, SystemStatus::Down).await;
}

async fn set_status_if_changed(manager: &Arc<SystemManager>, state: &Arc<SystemState>, status: SystemStatus) {
    if *state.status.read().await == status {
        return;
    }
    if let Err(err) = manager.set_status(&state.id, status).await {
        tracing::warn!(system = %state.id, err = %err, "failed to record status transition");
    }
}

/// Compare each configured alert's metric against the sample just taken,
/// flipping `triggered` on first breach and clearing it on recovery.
///
/// `minutes_sustained` hysteresis is not tracked here: that requires
/// looking back across persisted samples, which belongs to the alert
/// delivery collaborator, not this per-tick comparison.
async fn evaluate_alerts(manager: &Arc<SystemManager>, state: &Arc<SystemState>, data: &CombinedData, now_ms: i64) {
    let alerts = match manager.store().alerts_for_system(&state.id).await {
        Ok(alerts) => alerts,
        Err(err) => {
            tracing::warn!(system = %state.id, err = %err, "failed to load alerts");
            return;
        }
    };

    for alert in alerts {
        let observed = match alert.kind {
            crate::model::AlertKind::Cpu => data.stats.cpu_pct,
            crate::model::AlertKind::Memory => data.stats.mem_pct,
            crate::model::AlertKind::Disk => data.stats.disk_pct,
            crate::model::AlertKind::Network => (data.stats.net_rx_bytes + data.stats.net_tx_bytes) as f64,
            crate::model::AlertKind::Temperature | crate::model::AlertKind::Status => continue,
        };

        let breached = match alert.comparator {
            Comparator::GreaterThan => observed > alert.threshold,
            Comparator::GreaterOrEqual => observed >= alert.threshold,
            Comparator::LessThan => observed < alert.threshold,
            Comparator::LessOrEqual => observed <= alert.threshold,
        };

        if breached != alert.triggered {
            let last_fired_unix_ms = if breached { Some(now_ms) } else { alert.last_fired_unix_ms };
            if let Err(err) = manager.store().set_alert_triggered(&alert.id, breached, last_fired_unix_ms).await {
                tracing::warn!(system = %state.id, alert = %alert.id, err = %err, "failed to persist alert state");
                continue;
            }

            tracing::info!(
                system = %state.id,
                kind = ?alert.kind,
                observed,
                threshold = alert.threshold,
                triggered = breached,
                "alert threshold crossed"
            );

            manager.handle_system_alert(&alert, breached).await;
        }
    }
}

fn unix_ms_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
