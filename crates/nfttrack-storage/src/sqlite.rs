//! SQLite storage backend for NftTrack.
//!
//! Persists ownership records to a single SQLite file. Uses `sqlx` with WAL
//! mode so the read API can query while the tracker writes.
//!
//! # Usage
//! ```rust,no_run
//! use nfttrack_storage::sqlite::SqliteOwnershipStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteOwnershipStore::open("./nfttrack.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteOwnershipStore::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use nfttrack_core::error::TrackerError;
use nfttrack_core::store::OwnershipStore;
use nfttrack_core::types::{OwnershipRecord, TokenOrder};
use nfttrack_core::{Address, B256};

fn store_err(e: impl std::fmt::Display) -> TrackerError {
    TrackerError::Store(e.to_string())
}

/// SQLite-backed ownership store.
#[derive(Clone)]
pub struct SqliteOwnershipStore {
    pool: SqlitePool,
}

impl SqliteOwnershipStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./nfttrack.db"`) or a full
    /// SQLite URL (`"sqlite:./nfttrack.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, TrackerError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(store_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Every pooled connection to `sqlite::memory:` gets its own database,
    /// so the pool is pinned to a single connection. Ideal for tests.
    pub async fn in_memory() -> Result<Self, TrackerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(store_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create tables and enable WAL mode.
    async fn init_schema(&self) -> Result<(), TrackerError> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS ownership (
                token_id         INTEGER PRIMARY KEY,
                owner_address    TEXT    NOT NULL,
                contract_address TEXT    NOT NULL,
                last_tx_hash     TEXT    NOT NULL,
                observed_at      TEXT    NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_ownership_owner ON ownership (owner_address);",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    fn select_sql(filter: &str, order: TokenOrder) -> String {
        let direction = match order {
            TokenOrder::Ascending => "ASC",
            TokenOrder::Descending => "DESC",
        };
        format!(
            "SELECT token_id, owner_address, contract_address, last_tx_hash, observed_at
             FROM ownership {filter} ORDER BY token_id {direction}"
        )
    }
}

/// Addresses are stored EIP-55 checksummed so owner lookups are exact matches.
fn encode_address(address: &Address) -> String {
    address.to_checksum(None)
}

fn decode_row(row: &SqliteRow) -> Result<OwnershipRecord, TrackerError> {
    let owner: String = row.try_get("owner_address").map_err(store_err)?;
    let contract: String = row.try_get("contract_address").map_err(store_err)?;
    let tx_hash: String = row.try_get("last_tx_hash").map_err(store_err)?;
    let observed_at: DateTime<Utc> = row.try_get("observed_at").map_err(store_err)?;

    Ok(OwnershipRecord {
        token_id: row.try_get("token_id").map_err(store_err)?,
        owner_address: owner.parse::<Address>().map_err(store_err)?,
        contract_address: contract.parse::<Address>().map_err(store_err)?,
        last_tx_hash: tx_hash.parse::<B256>().map_err(store_err)?,
        observed_at,
    })
}

// ─── OwnershipStore impl ─────────────────────────────────────────────────────

#[async_trait]
impl OwnershipStore for SqliteOwnershipStore {
    async fn upsert(&self, record: &OwnershipRecord) -> Result<(), TrackerError> {
        // A single statement: SQLite applies it atomically.
        sqlx::query(
            "INSERT INTO ownership
             (token_id, owner_address, contract_address, last_tx_hash, observed_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(token_id) DO UPDATE SET
                owner_address    = excluded.owner_address,
                contract_address = excluded.contract_address,
                last_tx_hash     = excluded.last_tx_hash,
                observed_at      = excluded.observed_at",
        )
        .bind(record.token_id)
        .bind(encode_address(&record.owner_address))
        .bind(encode_address(&record.contract_address))
        .bind(format!("{:#x}", record.last_tx_hash))
        .bind(record.observed_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        debug!(token_id = record.token_id, owner = %record.owner_address, "ownership stored");
        Ok(())
    }

    async fn get(&self, token_id: i64) -> Result<Option<OwnershipRecord>, TrackerError> {
        let row = sqlx::query(
            "SELECT token_id, owner_address, contract_address, last_tx_hash, observed_at
             FROM ownership WHERE token_id = ?",
        )
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.as_ref().map(decode_row).transpose()
    }

    async fn find_all(&self, order: TokenOrder) -> Result<Vec<OwnershipRecord>, TrackerError> {
        let rows = sqlx::query(&Self::select_sql("", order))
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        rows.iter().map(decode_row).collect()
    }

    async fn find_by_owner(
        &self,
        owner: &Address,
        order: TokenOrder,
    ) -> Result<Vec<OwnershipRecord>, TrackerError> {
        let rows = sqlx::query(&Self::select_sql("WHERE owner_address = ?", order))
            .bind(encode_address(owner))
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        rows.iter().map(decode_row).collect()
    }

    async fn count(&self) -> Result<u64, TrackerError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM ownership")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        let cnt: i64 = row.try_get("cnt").map_err(store_err)?;
        Ok(cnt as u64)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
