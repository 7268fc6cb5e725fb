//! Shared types for the tracking pipeline.

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── TransferFact ─────────────────────────────────────────────────────────────

/// A decoded `Transfer(address,address,uint256)` log.
///
/// Produced once per log by the decoder and consumed once by the tracker;
/// never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFact {
    /// Token identifier (`topics[3]`).
    pub token_id: U256,
    /// Previous owner (`topics[1]`).
    pub from: Address,
    /// New owner (`topics[2]`).
    pub to: Address,
    /// Contract that emitted the log.
    pub contract_address: Address,
    /// Transaction that emitted the log.
    pub tx_hash: B256,
    /// Block containing the log.
    pub block_number: u64,
    /// Position of the log within its block.
    pub log_index: u64,
}

// ─── OwnershipRecord ──────────────────────────────────────────────────────────

/// Current owner of a single token, keyed by `token_id`.
///
/// Storage backends and the read API each have their own encoding of this
/// type; it is never written to the wire directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipRecord {
    /// Unique key. Set on first insertion, never changed afterwards.
    pub token_id: i64,
    pub owner_address: Address,
    pub contract_address: Address,
    /// Hash of the transaction that produced the current owner.
    pub last_tx_hash: B256,
    /// When the tracker applied the latest transfer.
    pub observed_at: DateTime<Utc>,
}

// ─── TokenOrder ───────────────────────────────────────────────────────────────

/// Sort direction for store reads, by token id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenOrder {
    Ascending,
    #[default]
    Descending,
}
