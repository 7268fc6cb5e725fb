//! Filter query planner.
//!
//! Builds the immutable `eth_getLogs`-style descriptor for both the one-shot
//! backfill and each incremental poll. An inverted range is not an error: the
//! planner returns `None` and the caller skips the fetch.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// A log query over an inclusive block range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    /// Contracts whose logs are wanted.
    pub addresses: Vec<Address>,
    /// Required `topics[0]` (event signature hash).
    pub topic0: B256,
    /// First block (inclusive).
    pub from_block: u64,
    /// Last block (inclusive).
    pub to_block: u64,
}

impl LogQuery {
    /// Build a query, or `None` if `from_block > to_block`.
    pub fn new(addresses: Vec<Address>, topic0: B256, from_block: u64, to_block: u64) -> Option<Self> {
        (from_block <= to_block).then_some(Self {
            addresses,
            topic0,
            from_block,
            to_block,
        })
    }

    /// Number of blocks covered by the query.
    pub fn span(&self) -> u64 {
        self.to_block - self.from_block + 1
    }

    /// Returns `true` if `block` lies inside the query range.
    pub fn contains_block(&self, block: u64) -> bool {
        (self.from_block..=self.to_block).contains(&block)
    }

    /// Split into consecutive sub-queries of at most `max_span` blocks each.
    ///
    /// A `max_span` of 0 is treated as 1.
    pub fn chunks(&self, max_span: u64) -> Vec<LogQuery> {
        let max_span = max_span.max(1);
        let mut out = Vec::new();
        let mut start = self.from_block;
        loop {
            let end = start.saturating_add(max_span - 1).min(self.to_block);
            out.push(LogQuery {
                addresses: self.addresses.clone(),
                topic0: self.topic0,
                from_block: start,
                to_block: end,
            });
            if end >= self.to_block {
                break;
            }
            start = end + 1;
        }
        out
    }
}

/// Plans backfill and poll queries for a fixed contract set and event topic.
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    addresses: Vec<Address>,
    topic0: B256,
}

impl QueryPlanner {
    pub fn new(addresses: Vec<Address>, topic0: B256) -> Self {
        Self { addresses, topic0 }
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn topic0(&self) -> B256 {
        self.topic0
    }

    /// Backfill: `[start_block, head]`.
    pub fn plan_backfill(&self, start_block: u64, head: u64) -> Option<LogQuery> {
        LogQuery::new(self.addresses.clone(), self.topic0, start_block, head)
    }

    /// Poll: `[cursor + 1, head]`.
    pub fn plan_poll(&self, cursor: u64, head: u64) -> Option<LogQuery> {
        let from = cursor.checked_add(1)?;
        LogQuery::new(self.addresses.clone(), self.topic0, from, head)
    }
}
