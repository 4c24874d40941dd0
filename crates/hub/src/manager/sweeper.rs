// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH aggregate polling controller.
//!
//! Independent of each system's own updater ticker: this periodically
//! nudges a quarter of the SSH-backed fleet that hasn't reported recently,
//! smoothing out drift and catching systems whose updater is stuck waiting
//! on a slow dial. WebSocket-backed systems push on their own cadence and
//! are never touched here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

use crate::manager::worker;
use crate::manager::{SystemManager, SystemState, TransportKind};
use crate::model::SystemStatus;

/// Run the sweeper until the process shuts down; the ticker itself never exits.
pub async fn run(manager: Arc<SystemManager>) {
    let mut ticker = tokio::time::interval(manager.config().sweep_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        sweep_once(&manager).await;
    }
}

struct Candidate {
    state: Arc<SystemState>,
    staleness: Duration,
    is_down: bool,
}

async fn sweep_once(manager: &Arc<SystemManager>) {
    let window = manager.config().sweep_window();
    let now = Instant::now();

    let mut candidates = Vec::new();
    for state in manager.snapshot().await {
        if state.kind != TransportKind::Ssh {
            continue;
        }
        let status = *state.status.read().await;
        if status == SystemStatus::Paused {
            continue;
        }

        let last = *state.last_persisted_at.read().await;
        let staleness = match last {
            Some(at) => now.saturating_duration_since(at),
            None => Duration::MAX,
        };
        if staleness < window {
            continue;
        }

        candidates.push(Candidate { state, staleness, is_down: status == SystemStatus::Down });
    }

    // Stalest first: a system that hasn't reported in longest gets priority.
    candidates.sort_by(|a, b| b.staleness.cmp(&a.staleness));

    // `Down` systems don't count toward the batch-size budget; they're cheap
    // to retry and shouldn't crowd out systems that are merely stale.
    let non_down = candidates.iter().filter(|c| !c.is_down).count();
    let budget = non_down.div_ceil(4).max(1).min(candidates.len());

    for candidate in candidates.into_iter().take(budget) {
        let manager = Arc::clone(manager);
        tokio::spawn(async move {
            worker::poll_now(&manager, &candidate.state).await;
        });
    }
}
