// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two interchangeable connectors from the hub to an agent: an outbound
//! SSH poll and an accepted WebSocket push/pull session.

pub mod auth;
pub mod frame;
pub mod ssh;
pub mod ws;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::HubError;
use crate::model::CombinedData;

/// Capability set the [`crate::manager`] needs from either transport
/// variant. Object-safe (`Box<dyn Transport>`) so a system's updater can
/// hold whichever adapter it dialed or accepted without a generic parameter.
pub trait Transport: Send + Sync {
    /// Request the agent's latest `CombinedData` sample, bounded by `deadline`.
    fn request_data(
        &self,
        deadline: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<CombinedData, HubError>> + Send + '_>>;

    /// Tear down the underlying connection. Idempotent.
    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Best-effort liveness check that does not itself perform I/O.
    fn is_alive(&self) -> bool;
}
