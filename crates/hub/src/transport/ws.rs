// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accepted-connection transport: the hub side of an agent's WebSocket.
//!
//! This is a single-caller generalization of a request/response correlation
//! pattern: one send-queue into the socket, one pending-response slot, and a
//! lock that serializes concurrent [`Transport::request_data`] callers so at
//! most one request is ever in flight, matching the one-request-per-
//! connection rule the agent protocol requires.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::HubError;
use crate::model::{CombinedData, ConfigUpdateRequest};
use crate::transport::frame::{self, Frame, FrameAction};
use crate::transport::Transport;

/// The hub's side of an agent WebSocket, after enrolment has bound it to a
/// system. Constructing one implies the connection is already `Verified`;
/// there is no path back to `Unverified`.
pub struct WsTransport {
    to_socket: mpsc::UnboundedSender<Vec<u8>>,
    pending: Mutex<Option<oneshot::Sender<Frame>>>,
    request_lock: Mutex<()>,
    alive: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl WsTransport {
    /// Take ownership of an already-upgraded, already-handshaken socket and
    /// spawn its read/write pump.
    pub fn spawn(socket: WebSocket, parent_cancel: &CancellationToken) -> Arc<Self> {
        let cancel = parent_cancel.child_token();
        let alive = Arc::new(AtomicBool::new(true));
        let (to_socket, from_caller) = mpsc::unbounded_channel();

        let transport = Arc::new(Self {
            to_socket,
            pending: Mutex::new(None),
            request_lock: Mutex::new(()),
            alive: Arc::clone(&alive),
            cancel: cancel.clone(),
        });

        tokio::spawn(run_pump(socket, cancel, alive, Arc::clone(&transport), from_caller));
        transport
    }

    /// Queue a `ConfigUpdate` push toward the agent. Out-of-core: the core
    /// never originates one, but the channel must accept it without
    /// disturbing any in-flight `GetData` correlation.
    pub fn push_config_update(&self, update: &ConfigUpdateRequest) -> Result<(), HubError> {
        let bytes = frame::encode(FrameAction::ConfigUpdate, update)?;
        self.to_socket.send(bytes).map_err(|_| HubError::UpgradeFailed)
    }

    async fn complete_pending(&self, frame: Frame) {
        if let Some(tx) = self.pending.lock().await.take() {
            let _ = tx.send(frame);
        }
    }

    /// Construct a transport without spawning a real socket pump, so unit
    /// tests can exercise the request/response correlation logic directly.
    #[cfg(test)]
    fn new_for_test() -> (Arc<Self>, mpsc::UnboundedReceiver<Vec<u8>>) {
        let cancel = CancellationToken::new();
        let (to_socket, from_caller) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            to_socket,
            pending: Mutex::new(None),
            request_lock: Mutex::new(()),
            alive: Arc::new(AtomicBool::new(true)),
            cancel,
        });
        (transport, from_caller)
    }
}

impl Transport for WsTransport {
    fn request_data(
        &self,
        deadline: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<CombinedData, HubError>> + Send + '_>> {
        Box::pin(async move {
            // Only one in-flight request per connection; concurrent callers
            // queue here rather than racing on `pending`.
            let _serialize = self.request_lock.lock().await;

            if self.cancel.is_cancelled() {
                return Err(HubError::TransportTimeout);
            }

            let (tx, rx) = oneshot::channel();
            *self.pending.lock().await = Some(tx);

            let bytes = frame::encode(FrameAction::GetData, &serde_json::json!({}))?;
            self.to_socket.send(bytes).map_err(|_| HubError::TransportTimeout)?;

            let frame = tokio::select! {
                result = tokio::time::timeout(deadline, rx) => {
                    result.map_err(|_| HubError::TransportTimeout)?.map_err(|_| HubError::TransportTimeout)?
                }
                _ = self.cancel.cancelled() => return Err(HubError::TransportTimeout),
            };

            if frame.action != FrameAction::CombinedData {
                return Err(HubError::ProtocolViolation);
            }
            frame.payload_as()
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            self.cancel.cancel();
            self.alive.store(false, Ordering::Relaxed);
        })
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }
}

async fn run_pump(
    socket: WebSocket,
    cancel: CancellationToken,
    alive: Arc<AtomicBool>,
    transport: Arc<WsTransport>,
    mut from_caller: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            outgoing = from_caller.recv() => {
                match outgoing {
                    Some(bytes) => {
                        if ws_tx.send(Message::Binary(bytes.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Binary(bytes))) => {
                        match frame::decode(&bytes) {
                            Ok(frame) => transport.complete_pending(frame).await,
                            Err(e) => tracing::debug!(err = %e, "dropping malformed agent frame"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {} // ping/pong/text ignored
                }
            }
        }
    }

    alive.store(false, Ordering::Relaxed);
    cancel.cancel();
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
