//! `TransferDecoder` — raw `Transfer` logs to typed transfer facts.
//!
//! # Indexed-parameter layout
//! All three parameters of `Transfer(address,address,uint256)` are indexed,
//! so the log carries exactly four topics and an unused data payload:
//!
//! ```text
//! topics[0]  keccak256("Transfer(address,address,uint256)")
//! topics[1]  from     (address in the low 20 bytes)
//! topics[2]  to       (address in the low 20 bytes)
//! topics[3]  tokenId  (uint256, big-endian)
//! ```

use nfttrack_core::error::DecodeError;
use nfttrack_core::types::TransferFact;
use nfttrack_core::{Address, B256, U256};

use crate::abi::EventShape;
use crate::fetcher::RawLog;

/// Number of topics on a well-formed transfer log.
const TRANSFER_TOPICS: usize = 4;

/// Stateless decoder for the tracked transfer event.
///
/// The event shape is parsed and validated once in the constructor; decoding
/// only compares against the cached topic0.
#[derive(Debug, Clone)]
pub struct TransferDecoder {
    shape: EventShape,
    topic0: B256,
}

impl TransferDecoder {
    /// Build a decoder from the built-in transfer ABI.
    pub fn new() -> Result<Self, nfttrack_core::TrackerError> {
        Ok(Self::from_shape(EventShape::transfer()?))
    }

    /// Build a decoder from an already validated shape.
    pub fn from_shape(shape: EventShape) -> Self {
        let topic0 = shape.topic0();
        Self { shape, topic0 }
    }

    pub fn shape(&self) -> &EventShape {
        &self.shape
    }

    /// The expected `topics[0]`.
    pub fn topic0(&self) -> B256 {
        self.topic0
    }

    /// Decode one log into a [`TransferFact`].
    pub fn decode(&self, log: &RawLog) -> Result<TransferFact, DecodeError> {
        if log.topics.len() != TRANSFER_TOPICS {
            return Err(DecodeError::TopicCount {
                expected: TRANSFER_TOPICS,
                actual: log.topics.len(),
            });
        }

        let signature = parse_topic(&log.topics[0], 0)?;
        if signature != self.topic0 {
            return Err(DecodeError::SignatureMismatch {
                expected: format!("{:#x}", self.topic0),
                actual: format!("{signature:#x}"),
            });
        }

        let from = Address::from_word(parse_topic(&log.topics[1], 1)?);
        let to = Address::from_word(parse_topic(&log.topics[2], 2)?);
        let token_id = U256::from_be_bytes(parse_topic(&log.topics[3], 3)?.0);

        let contract_address = log
            .address
            .parse::<Address>()
            .map_err(|e| malformed("address", e))?;
        let tx_hash = log
            .tx_hash
            .parse::<B256>()
            .map_err(|e| malformed("transactionHash", e))?;
        let block_number = log
            .block_number_u64()
            .ok_or_else(|| malformed("blockNumber", &log.block_number))?;
        let log_index = log
            .log_index_u64()
            .ok_or_else(|| malformed("logIndex", &log.log_index))?;

        Ok(TransferFact {
            token_id,
            from,
            to,
            contract_address,
            tx_hash,
            block_number,
            log_index,
        })
    }
}

fn malformed(field: &'static str, reason: impl std::fmt::Display) -> DecodeError {
    DecodeError::MalformedField {
        field,
        reason: reason.to_string(),
    }
}

fn parse_topic(topic: &str, index: usize) -> Result<B256, DecodeError> {
    topic.parse::<B256>().map_err(|e| DecodeError::MalformedTopic {
        index,
        reason: e.to_string(),
    })
}
