//! In-memory storage backend.
//!
//! Keeps ownership records in RAM, keyed by token id. Useful for tests and
//! short-lived trackers that don't need persistence.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use nfttrack_core::error::TrackerError;
use nfttrack_core::store::OwnershipStore;
use nfttrack_core::types::{OwnershipRecord, TokenOrder};
use nfttrack_core::Address;

/// In-memory ownership store.
///
/// All data is lost when the process exits. Every operation holds the lock
/// for its whole duration, so an upsert is atomic per key.
#[derive(Default)]
pub struct InMemoryOwnershipStore {
    records: Mutex<BTreeMap<i64, OwnershipRecord>>,
}

impl InMemoryOwnershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<i64, OwnershipRecord>>, TrackerError> {
        self.records
            .lock()
            .map_err(|_| TrackerError::Store("in-memory store lock poisoned".into()))
    }
}

fn sorted<'a>(
    records: impl DoubleEndedIterator<Item = &'a OwnershipRecord>,
    order: TokenOrder,
) -> Vec<OwnershipRecord> {
    match order {
        TokenOrder::Ascending => records.cloned().collect(),
        TokenOrder::Descending => records.rev().cloned().collect(),
    }
}

#[async_trait]
impl OwnershipStore for InMemoryOwnershipStore {
    async fn upsert(&self, record: &OwnershipRecord) -> Result<(), TrackerError> {
        let mut records = self.lock()?;
        match records.get_mut(&record.token_id) {
            Some(existing) => {
                existing.owner_address = record.owner_address;
                existing.contract_address = record.contract_address;
                existing.last_tx_hash = record.last_tx_hash;
                existing.observed_at = record.observed_at;
            }
            None => {
                records.insert(record.token_id, record.clone());
            }
        }
        Ok(())
    }

    async fn get(&self, token_id: i64) -> Result<Option<OwnershipRecord>, TrackerError> {
        Ok(self.lock()?.get(&token_id).cloned())
    }

    async fn find_all(&self, order: TokenOrder) -> Result<Vec<OwnershipRecord>, TrackerError> {
        let records = self.lock()?;
        Ok(sorted(records.values(), order))
    }

    async fn find_by_owner(
        &self,
        owner: &Address,
        order: TokenOrder,
    ) -> Result<Vec<OwnershipRecord>, TrackerError> {
        let records = self.lock()?;
        let owned: Vec<&OwnershipRecord> = records
            .values()
            .filter(|r| r.owner_address == *owner)
            .collect();
        Ok(sorted(owned.into_iter(), order))
    }

    async fn count(&self) -> Result<u64, TrackerError> {
        Ok(self.lock()?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use nfttrack_core::B256;

    fn record(token_id: i64, owner: u8) -> OwnershipRecord {
        OwnershipRecord {
            token_id,
            owner_address: Address::repeat_byte(owner),
            contract_address: Address::repeat_byte(0xcc),
            last_tx_hash: B256::repeat_byte(owner),
            observed_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn insert_then_replace_keeps_one_record() {
        let store = InMemoryOwnershipStore::new();
        store.upsert(&record(7, 0x01)).await.unwrap();
        store.upsert(&record(7, 0x02)).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let stored = store.get(7).await.unwrap().unwrap();
        assert_eq!(stored.owner_address, Address::repeat_byte(0x02));
        assert_eq!(stored.last_tx_hash, B256::repeat_byte(0x02));
    }

    #[tokio::test]
    async fn find_all_sorted_descending() {
        let store = InMemoryOwnershipStore::new();
        for id in [3, 10, 1] {
            store.upsert(&record(id, 0x01)).await.unwrap();
        }
        let ids: Vec<i64> = store
            .find_all(TokenOrder::Descending)
            .await
            .unwrap()
            .iter()
            .map(|r| r.token_id)
            .collect();
        assert_eq!(ids, vec![10, 3, 1]);

        let asc = store.find_all(TokenOrder::Ascending).await.unwrap();
        assert_eq!(asc.first().unwrap().token_id, 1);
    }

    #[tokio::test]
    async fn find_by_owner_filters() {
        let store = InMemoryOwnershipStore::new();
        store.upsert(&record(1, 0x01)).await.unwrap();
        store.upsert(&record(2, 0x02)).await.unwrap();
        store.upsert(&record(5, 0x01)).await.unwrap();

        let owned = store
            .find_by_owner(&Address::repeat_byte(0x01), TokenOrder::Descending)
            .await
            .unwrap();
        let ids: Vec<i64> = owned.iter().map(|r| r.token_id).collect();
        assert_eq!(ids, vec![5, 1]);

        let none = store
            .find_by_owner(&Address::repeat_byte(0x09), TokenOrder::Descending)
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
