//! Ownership upsert — turns a transfer fact into a stored ownership record.

use alloy_primitives::U256;
use chrono::{DateTime, Utc};

use crate::error::TrackerError;
use crate::store::OwnershipStore;
use crate::types::{OwnershipRecord, TransferFact};

/// Largest token id the store can key on: `i64::MAX` (2^63 - 1).
pub const MAX_TOKEN_KEY: i64 = i64::MAX;

/// Convert a 256-bit token id into the store's signed 64-bit key.
///
/// Accepts exactly `0..=i64::MAX`. Larger ids are rejected with
/// [`TrackerError::Range`], never truncated.
pub fn token_key(token_id: U256) -> Result<i64, TrackerError> {
    if token_id.bit_len() > 63 {
        return Err(TrackerError::Range {
            token_id: token_id.to_string(),
        });
    }
    // bit_len <= 63: the value lives in the low limb and fits i64.
    Ok(token_id.as_limbs()[0] as i64)
}

/// Build the record a transfer fact produces. The new owner is `fact.to`.
pub fn record_for(
    fact: &TransferFact,
    observed_at: DateTime<Utc>,
) -> Result<OwnershipRecord, TrackerError> {
    Ok(OwnershipRecord {
        token_id: token_key(fact.token_id)?,
        owner_address: fact.to,
        contract_address: fact.contract_address,
        last_tx_hash: fact.tx_hash,
        observed_at,
    })
}

/// Apply one transfer fact to the store (last write wins).
///
/// Idempotent for identical facts. Not order-aware: the stored block/log
/// position is not compared before overwriting, so applying an older fact
/// after a newer one leaves the older owner in place.
pub async fn apply_transfer(
    store: &dyn OwnershipStore,
    fact: &TransferFact,
    observed_at: DateTime<Utc>,
) -> Result<OwnershipRecord, TrackerError> {
    let record = record_for(fact, observed_at)?;
    store.upsert(&record).await?;
    tracing::debug!(
        token_id = record.token_id,
        owner = %record.owner_address,
        block = fact.block_number,
        "ownership updated"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256};

    #[test]
    fn small_ids_convert() {
        assert_eq!(token_key(U256::ZERO).unwrap(), 0);
        assert_eq!(token_key(U256::from(7u64)).unwrap(), 7);
    }

    #[test]
    fn boundary_is_i64_max() {
        let max = U256::from(i64::MAX as u64);
        assert_eq!(token_key(max).unwrap(), MAX_TOKEN_KEY);

        let over = max + U256::from(1u64);
        assert!(matches!(token_key(over), Err(TrackerError::Range { .. })));
    }

    #[test]
    fn huge_ids_are_rejected_not_truncated() {
        let err = token_key(U256::MAX).unwrap_err();
        match err {
            TrackerError::Range { token_id } => assert_eq!(token_id, U256::MAX.to_string()),
            other => panic!("unexpected error: {other}"),
        }
        // 2^64 + 5 would truncate to 5 if we took the low limb blindly.
        let wraps = (U256::from(1u64) << 64usize) + U256::from(5u64);
        assert!(token_key(wraps).is_err());
    }

    #[test]
    fn record_takes_receiver_as_owner() {
        let fact = TransferFact {
            token_id: U256::from(42u64),
            from: Address::repeat_byte(0xaa),
            to: Address::repeat_byte(0xbb),
            contract_address: Address::repeat_byte(0xcc),
            tx_hash: B256::repeat_byte(0x01),
            block_number: 10,
            log_index: 0,
        };
        let now = Utc::now();
        let record = record_for(&fact, now).unwrap();
        assert_eq!(record.token_id, 42);
        assert_eq!(record.owner_address, Address::repeat_byte(0xbb));
        assert_eq!(record.contract_address, Address::repeat_byte(0xcc));
        assert_eq!(record.last_tx_hash, B256::repeat_byte(0x01));
        assert_eq!(record.observed_at, now);
    }

    /// Counts upserts and fails every one of them.
    #[derive(Default)]
    struct FailingStore {
        calls: std::sync::Mutex<usize>,
    }

    #[async_trait::async_trait]
    impl OwnershipStore for FailingStore {
        async fn upsert(&self, _: &OwnershipRecord) -> Result<(), TrackerError> {
            *self.calls.lock().unwrap() += 1;
            Err(TrackerError::Store("disk full".into()))
        }
        async fn get(&self, _: i64) -> Result<Option<OwnershipRecord>, TrackerError> {
            Ok(None)
        }
        async fn find_all(&self, _: crate::types::TokenOrder) -> Result<Vec<OwnershipRecord>, TrackerError> {
            Ok(Vec::new())
        }
        async fn find_by_owner(
            &self,
            _: &Address,
            _: crate::types::TokenOrder,
        ) -> Result<Vec<OwnershipRecord>, TrackerError> {
            Ok(Vec::new())
        }
        async fn count(&self) -> Result<u64, TrackerError> {
            Ok(0)
        }
    }

    fn fact(token_id: U256) -> TransferFact {
        TransferFact {
            token_id,
            from: Address::ZERO,
            to: Address::repeat_byte(0xbb),
            contract_address: Address::repeat_byte(0xcc),
            tx_hash: B256::ZERO,
            block_number: 1,
            log_index: 0,
        }
    }

    #[tokio::test]
    async fn store_error_is_returned() {
        let store = FailingStore::default();
        let err = apply_transfer(&store, &fact(U256::from(1u64)), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Store(_)));
        assert_eq!(*store.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn out_of_range_never_reaches_store() {
        let store = FailingStore::default();
        let err = apply_transfer(&store, &fact(U256::MAX), Utc::now()).await.unwrap_err();
        assert!(matches!(err, TrackerError::Range { .. }));
        assert_eq!(*store.calls.lock().unwrap(), 0);
    }
}
