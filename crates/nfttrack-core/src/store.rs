//! Ownership store interface.
//!
//! The tracker only ever depends on this trait; backends live in
//! `nfttrack-storage`. A handle is built once at startup and shared as
//! `Arc<dyn OwnershipStore>` between the tracker and the read API.

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::error::TrackerError;
use crate::types::{OwnershipRecord, TokenOrder};

/// Keyed, idempotent persistence for ownership records.
#[async_trait]
pub trait OwnershipStore: Send + Sync {
    /// Insert the record if no record exists for `record.token_id`, otherwise
    /// replace its owner, contract, tx hash and timestamp.
    ///
    /// Must be atomic per key: concurrent readers never observe a partially
    /// written record.
    async fn upsert(&self, record: &OwnershipRecord) -> Result<(), TrackerError>;

    /// Look up a single token.
    async fn get(&self, token_id: i64) -> Result<Option<OwnershipRecord>, TrackerError>;

    /// All records, sorted by token id.
    async fn find_all(&self, order: TokenOrder) -> Result<Vec<OwnershipRecord>, TrackerError>;

    /// Records currently owned by `owner`, sorted by token id.
    async fn find_by_owner(
        &self,
        owner: &Address,
        order: TokenOrder,
    ) -> Result<Vec<OwnershipRecord>, TrackerError>;

    /// Number of stored records.
    async fn count(&self) -> Result<u64, TrackerError>;
}
