//! HTTP JSON-RPC event source backed by `reqwest`.
//!
//! Uses `eth_blockNumber` for the chain head and `eth_getLogs` for log
//! ranges. Transport failures are retried with exponential backoff; a
//! connection failure that survives every retry means the source is
//! unavailable and is reported as [`TrackerError::Connection`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use nfttrack_core::error::TrackerError;
use nfttrack_core::query::LogQuery;

use crate::fetcher::{parse_hex_u64, to_hex_quantity, EventSource, RawLog};

// ─── Retry policy ─────────────────────────────────────────────────────────────

/// Exponential backoff configuration for transport failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the first try).
    pub max_retries: u32,
    /// Initial backoff delay.
    pub initial_backoff: Duration,
    /// Maximum backoff delay (caps exponential growth).
    pub max_backoff: Duration,
    /// Multiplier applied to backoff on each retry.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Returns the delay before the `attempt`-th retry (1-based), or `None`
    /// once `max_retries` is exceeded.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt > self.max_retries {
            return None;
        }
        let base_ms = self.initial_backoff.as_millis() as f64
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base_ms.min(self.max_backoff.as_millis() as f64);
        Some(Duration::from_millis(capped as u64))
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

// ─── Transport errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

impl TransportError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Http(_))
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}

impl From<TransportError> for TrackerError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Connect(_) => TrackerError::Connection(e.to_string()),
            _ => TrackerError::Fetch(e.to_string()),
        }
    }
}

// ─── HttpEventSource ──────────────────────────────────────────────────────────

/// Configuration for `HttpEventSource`.
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    pub retry: RetryConfig,
    pub request_timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// JSON-RPC event source for any EVM node.
pub struct HttpEventSource {
    url: String,
    http: reqwest::Client,
    retry: RetryConfig,
    next_id: AtomicU64,
}

impl HttpEventSource {
    /// Create a source for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpSourceConfig) -> Result<Self, TrackerError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(TrackerError::Config("RPC endpoint is empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TrackerError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url,
            http,
            retry: config.retry,
            next_id: AtomicU64::new(1),
        })
    }

    /// Create a source and verify the endpoint answers (`eth_chainId`).
    ///
    /// Any failure here is a [`TrackerError::Connection`].
    pub async fn connect(url: impl Into<String>, config: HttpSourceConfig) -> Result<Self, TrackerError> {
        let source = Self::new(url, config)?;
        let chain_id: String = source
            .call("eth_chainId", json!([]))
            .await
            .map_err(|e| TrackerError::Connection(e.to_string()))?;
        tracing::info!(url = %source.url, chain_id = %chain_id, "connected to event source");
        Ok(source)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &Value,
    ) -> Result<T, TransportError> {
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params: params.clone(),
        };

        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        let body: JsonRpcResponse = resp.json().await.map_err(TransportError::from_reqwest)?;
        if let Some(err) = body.error {
            return Err(TransportError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        serde_json::from_value(body.result.unwrap_or(Value::Null))
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Call `method`, retrying transport failures with backoff.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, TransportError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_once(method, &params).await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            method,
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(attempt, error = %e, method, "max retries exceeded");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }
}

/// `eth_getLogs` filter object for a query.
pub fn logs_filter(query: &LogQuery) -> Value {
    let addresses: Vec<String> = query.addresses.iter().map(|a| format!("{a:#x}")).collect();
    json!({
        "fromBlock": to_hex_quantity(query.from_block),
        "toBlock": to_hex_quantity(query.to_block),
        "address": addresses,
        "topics": [[format!("{:#x}", query.topic0)]],
    })
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn current_head(&self) -> Result<u64, TrackerError> {
        let hex: String = self.call("eth_blockNumber", json!([])).await?;
        parse_hex_u64(&hex)
            .ok_or_else(|| TrackerError::Fetch(format!("invalid block number '{hex}'")))
    }

    async fn fetch_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, TrackerError> {
        let logs: Vec<RawLog> = self.call("eth_getLogs", json!([logs_filter(query)])).await?;
        tracing::debug!(
            from = query.from_block,
            to = query.to_block,
            logs = logs.len(),
            "eth_getLogs"
        );
        Ok(logs)
    }
}
