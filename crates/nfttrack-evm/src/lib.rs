//! nfttrack-evm — transfer-log decoding, JSON-RPC event source and the
//! tracker loop.

pub mod abi;
pub mod builder;
pub mod decoder;
pub mod fetcher;
pub mod rpc;
pub mod tracker;

pub use abi::{EventShape, TRANSFER_EVENT_ABI};
pub use builder::TrackerBuilder;
pub use decoder::TransferDecoder;
pub use fetcher::{EventSource, RawLog};
pub use rpc::{HttpEventSource, HttpSourceConfig, RetryConfig};
pub use tracker::{BatchReport, TickOutcome, TransferTracker};
