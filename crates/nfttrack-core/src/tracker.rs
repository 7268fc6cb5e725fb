//! Tracker configuration and state types.

use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Configuration for a tracker instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Token contracts whose `Transfer` logs are tracked.
    pub contract_addresses: Vec<Address>,
    /// First block of the backfill (inclusive).
    pub start_block: u64,
    /// Fixed interval between poll ticks.
    pub poll_interval: Duration,
    /// Split the backfill into sub-ranges of at most this many blocks.
    /// `None` fetches the whole backfill range in one query.
    pub backfill_chunk_size: Option<u64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            contract_addresses: Vec::new(),
            start_block: 0,
            poll_interval: DEFAULT_POLL_INTERVAL,
            backfill_chunk_size: None,
        }
    }
}

impl TrackerConfig {
    /// Check the values the tracker cannot start without.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.contract_addresses.is_empty() {
            return Err(TrackerError::Config("no contract addresses configured".into()));
        }
        if self.contract_addresses.iter().any(|a| a.is_zero()) {
            return Err(TrackerError::Config("zero address in contract set".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(TrackerError::Config("poll interval must be non-zero".into()));
        }
        if self.backfill_chunk_size == Some(0) {
            return Err(TrackerError::Config("backfill chunk size must be non-zero".into()));
        }
        Ok(())
    }
}

/// Lifecycle of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerState {
    /// Resolving the contract set and event signature.
    Initializing,
    /// Processing the historical range up to the head seen at startup.
    Backfilling,
    /// Following the chain on a fixed timer.
    Polling,
    /// Terminated by cancellation or a fatal error.
    Stopped,
}

impl std::fmt::Display for TrackerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Backfilling => write!(f, "backfilling"),
            Self::Polling => write!(f, "polling"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
