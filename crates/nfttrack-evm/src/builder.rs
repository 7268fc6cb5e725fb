//! Fluent builder API for tracker configuration.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use nfttrack_evm::TrackerBuilder;
//!
//! let config = TrackerBuilder::new()
//!     .address("0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D".parse().unwrap())
//!     .start_block(12_287_507)
//!     .poll_interval(Duration::from_secs(60))
//!     .backfill_chunk_size(5_000)
//!     .build_config()
//!     .unwrap();
//! assert_eq!(config.contract_addresses.len(), 1);
//! ```

use std::time::Duration;

use nfttrack_core::error::TrackerError;
use nfttrack_core::tracker::TrackerConfig;
use nfttrack_core::Address;

/// Fluent builder for `TrackerConfig`.
#[derive(Default)]
pub struct TrackerBuilder {
    config: TrackerConfig,
}

impl TrackerBuilder {
    pub fn new() -> Self {
        Self {
            config: TrackerConfig::default(),
        }
    }

    /// Replace the tracked contract set.
    pub fn contract_addresses(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.config.contract_addresses = addresses.into_iter().collect();
        self
    }

    /// Add one contract to the tracked set.
    pub fn address(mut self, address: Address) -> Self {
        self.config.contract_addresses.push(address);
        self
    }

    /// Set the first block of the backfill.
    pub fn start_block(mut self, block: u64) -> Self {
        self.config.start_block = block;
        self
    }

    /// Set the fixed interval between poll ticks.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Split the backfill into sub-ranges of at most `blocks` blocks.
    pub fn backfill_chunk_size(mut self, blocks: u64) -> Self {
        self.config.backfill_chunk_size = Some(blocks);
        self
    }

    /// Validate and return the `TrackerConfig`.
    pub fn build_config(self) -> Result<TrackerConfig, TrackerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
