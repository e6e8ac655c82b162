//! Control-plane client.
//!
//! Every worker node exposes a small out-of-band HTTP API for wiring and
//! inspection, separate from the KV data path:
//!
//! | Endpoint              | Method | Body / Response                          |
//! |-----------------------|--------|------------------------------------------|
//! | `/listen_addr`        | GET    | `{"address": "host:port"}`               |
//! | `/connect_peer`       | POST   | `{"peer_id": N, "address": "host:port"}` |
//! | `/ready`              | POST   | none                                     |
//! | `/is_leader`          | GET    | `{"is_leader": bool}`                    |
//!
//! The bootstrap phases talk to it through the [`ControlPlane`] trait so the
//! whole orchestration is testable against scripted in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("control request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("control endpoint returned HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Deserialize)]
struct ListenAddrResponse {
    address: String,
}

#[derive(Debug, Serialize)]
struct ConnectPeerRequest<'a> {
    peer_id: u64,
    address: &'a str,
}

#[derive(Debug, Deserialize)]
struct LeaderStatusResponse {
    is_leader: bool,
}

/// Out-of-band API of a single worker node, addressed by control port.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// The transport address the node's consensus engine actually bound.
    async fn listen_addr(&self, port: u16) -> Result<String, ControlError>;

    /// Tell the node at `port` that peer `peer_id` lives at `peer_addr`.
    async fn connect_peer(&self, port: u16, peer_id: u64, peer_addr: &str)
        -> Result<(), ControlError>;

    /// Peer wiring is complete; the node may start its election timers.
    async fn mark_ready(&self, port: u16) -> Result<(), ControlError>;

    /// Whether the node currently considers itself the leader.
    async fn is_leader(&self, port: u16) -> Result<bool, ControlError>;
}

/// [`ControlPlane`] over plain HTTP with a per-request timeout, so one
/// unreachable node cannot stall a polling loop.
pub struct HttpControlPlane {
    client: reqwest::Client,
    host: String,
    request_timeout: Duration,
}

impl HttpControlPlane {
    pub fn new(host: impl Into<String>, request_timeout: Duration) -> Self {
        Self { client: reqwest::Client::new(), host: host.into(), request_timeout }
    }

    /// The usual case: worker processes on the local machine.
    pub fn localhost(request_timeout: Duration) -> Self {
        Self::new("127.0.0.1", request_timeout)
    }

    fn url(&self, port: u16, path: &str) -> String {
        format!("http://{}:{}{}", self.host, port, path)
    }

    fn check_status(status: reqwest::StatusCode) -> Result<(), ControlError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(ControlError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn listen_addr(&self, port: u16) -> Result<String, ControlError> {
        let resp = self
            .client
            .get(self.url(port, "/listen_addr"))
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::check_status(resp.status())?;
        let body: ListenAddrResponse = resp.json().await?;
        Ok(body.address)
    }

    async fn connect_peer(
        &self,
        port: u16,
        peer_id: u64,
        peer_addr: &str,
    ) -> Result<(), ControlError> {
        let resp = self
            .client
            .post(self.url(port, "/connect_peer"))
            .json(&ConnectPeerRequest { peer_id, address: peer_addr })
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::check_status(resp.status())
    }

    async fn mark_ready(&self, port: u16) -> Result<(), ControlError> {
        let resp = self
            .client
            .post(self.url(port, "/ready"))
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::check_status(resp.status())
    }

    async fn is_leader(&self, port: u16) -> Result<bool, ControlError> {
        let resp = self
            .client
            .get(self.url(port, "/is_leader"))
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::check_status(resp.status())?;
        let body: LeaderStatusResponse = resp.json().await?;
        Ok(body.is_leader)
    }
}
