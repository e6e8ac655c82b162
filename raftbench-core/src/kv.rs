//! Key-value data path client.
//!
//! The benchmark side only needs `put` and `get` against whatever node the
//! bootstrap reported as leader; the store's persistence and consistency
//! semantics are the worker's business.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("kv request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("kv endpoint returned HTTP {0}")]
    Status(u16),
}

/// The data-path capability the load generator runs against.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn put(&self, key: &str, value: &str) -> Result<(), KvError>;

    /// Returns the stored value and whether the key existed.
    async fn get(&self, key: &str) -> Result<(String, bool), KvError>;
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(default)]
    value: String,
    found: bool,
}

/// [`KvStore`] over the leader's HTTP API: `POST {base}/kv` to write,
/// `GET {base}/kv/{key}` to read.
pub struct HttpKvClient {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpKvClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl KvStore for HttpKvClient {
    async fn put(&self, key: &str, value: &str) -> Result<(), KvError> {
        let resp = self
            .client
            .post(format!("{}/kv", self.base_url))
            .json(&PutRequest { key, value })
            .timeout(self.request_timeout)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(KvError::Status(resp.status().as_u16()))
        }
    }

    async fn get(&self, key: &str) -> Result<(String, bool), KvError> {
        let resp = self
            .client
            .get(format!("{}/kv/{}", self.base_url, key))
            .timeout(self.request_timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(KvError::Status(resp.status().as_u16()));
        }
        let body: GetResponse = resp.json().await?;
        Ok((body.value, body.found))
    }
}
