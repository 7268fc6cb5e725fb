//! nfttrack-core — foundation for the token ownership tracker.
//!
//! # Architecture
//!
//! ```text
//! TransferTracker (nfttrack-evm)
//!      ├── QueryPlanner      (backfill / poll block ranges)
//!      ├── EventSource       (chain head + eth_getLogs)
//!      ├── TransferDecoder   (raw log → TransferFact)
//!      ├── apply_transfer    (TransferFact → OwnershipRecord upsert)
//!      └── OwnershipStore    (memory / SQLite)
//! ```

pub mod cursor;
pub mod error;
pub mod ownership;
pub mod query;
pub mod store;
pub mod tracker;
pub mod types;

pub use alloy_primitives::{Address, B256, U256};

pub use cursor::TrackingCursor;
pub use error::{DecodeError, TrackerError};
pub use ownership::{apply_transfer, token_key};
pub use query::{LogQuery, QueryPlanner};
pub use store::OwnershipStore;
pub use tracker::{TrackerConfig, TrackerState, DEFAULT_POLL_INTERVAL};
pub use types::{OwnershipRecord, TokenOrder, TransferFact};
