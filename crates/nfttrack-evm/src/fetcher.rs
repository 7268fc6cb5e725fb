//! Event source contract and the raw log wire type.
//!
//! An [`EventSource`] supplies the chain head and the logs matching a
//! [`LogQuery`]. Logs must come back ascending by block number, then by log
//! index; the tracker checks this and reports violations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use nfttrack_core::error::TrackerError;
use nfttrack_core::query::LogQuery;

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    #[serde(rename = "data")]
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "blockHash", default)]
    pub block_hash: Option<String>,
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(rename = "removed", default)]
    pub removed: Option<bool>,
}

impl RawLog {
    /// Returns the block number, or `None` if the field is not valid hex.
    pub fn block_number_u64(&self) -> Option<u64> {
        parse_hex_u64(&self.block_number)
    }

    /// Returns the log index, or `None` if the field is not valid hex.
    pub fn log_index_u64(&self) -> Option<u64> {
        parse_hex_u64(&self.log_index)
    }

    /// `(block, log index)` ordering key; malformed fields sort last.
    pub fn position(&self) -> (u64, u64) {
        (
            self.block_number_u64().unwrap_or(u64::MAX),
            self.log_index_u64().unwrap_or(u64::MAX),
        )
    }

    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }
}

/// Supplies logs and the chain head to the tracker.
///
/// Errors: [`TrackerError::Connection`] when the source cannot be reached at
/// all, [`TrackerError::Fetch`] for a transient failure of a single call.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Current chain head block number.
    async fn current_head(&self) -> Result<u64, TrackerError>;

    /// All logs matching `query`, ascending by `(block, log index)`.
    async fn fetch_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, TrackerError>;
}

/// Parse a hex-encoded string (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Option<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return None;
    }
    u64::from_str_radix(s, 16).ok()
}

/// Format a block number as a JSON-RPC quantity (`0x…`, no leading zeros).
pub fn to_hex_quantity(n: u64) -> String {
    format!("{n:#x}")
}
