//! Read API over the ownership store.
//!
//! ```text
//! GET /nft                    all records, highest token id first
//! GET /nft/:wallet_address    records owned by one wallet
//! GET /health                 liveness
//! ```

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nfttrack_core::error::TrackerError;
use nfttrack_core::store::OwnershipStore;
use nfttrack_core::types::{OwnershipRecord, TokenOrder};
use nfttrack_core::Address;

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn OwnershipStore>,
    pub startup_time: i64,
}

/// One ownership record on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftResponse {
    pub token_id: i64,
    pub owner_address: String,
    pub contract_address: String,
    pub tx_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&OwnershipRecord> for NftResponse {
    fn from(record: &OwnershipRecord) -> Self {
        Self {
            token_id: record.token_id,
            owner_address: record.owner_address.to_checksum(None),
            contract_address: record.contract_address.to_checksum(None),
            tx_hash: format!("{:#x}", record.last_tx_hash),
            timestamp: record.observed_at,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: i64,
    pub tokens: u64,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Store(TrackerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Store(e) => {
                tracing::error!(error = %e, "error fetching records");
                (StatusCode::INTERNAL_SERVER_ERROR, "error fetching NFTs".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn to_responses(records: &[OwnershipRecord]) -> Vec<NftResponse> {
    records.iter().map(NftResponse::from).collect()
}

async fn all_nfts(State(state): State<ApiState>) -> Result<Json<Vec<NftResponse>>, ApiError> {
    let records = state
        .store
        .find_all(TokenOrder::Descending)
        .await
        .map_err(ApiError::Store)?;
    Ok(Json(to_responses(&records)))
}

async fn wallet_nfts(
    State(state): State<ApiState>,
    Path(wallet_address): Path<String>,
) -> Result<Json<Vec<NftResponse>>, ApiError> {
    let owner = wallet_address
        .parse::<Address>()
        .map_err(|_| ApiError::BadRequest(format!("invalid wallet address '{wallet_address}'")))?;
    let records = state
        .store
        .find_by_owner(&owner, TokenOrder::Descending)
        .await
        .map_err(ApiError::Store)?;
    Ok(Json(to_responses(&records)))
}

async fn health(State(state): State<ApiState>) -> Result<Json<HealthResponse>, ApiError> {
    let tokens = state.store.count().await.map_err(ApiError::Store)?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: Utc::now().timestamp() - state.startup_time,
        tokens,
    }))
}

/// Build the read API router over `store`.
pub fn router(store: Arc<dyn OwnershipStore>) -> Router {
    let state = ApiState {
        store,
        startup_time: Utc::now().timestamp(),
    };

    Router::new()
        .route("/nft", get(all_nfts))
        .route("/nft/:wallet_address", get(wallet_nfts))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use nfttrack_core::B256;
    use nfttrack_storage::InMemoryOwnershipStore;
    use tower::ServiceExt;

    const WALLET: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

    fn record(token_id: i64, owner: Address) -> OwnershipRecord {
        OwnershipRecord {
            token_id,
            owner_address: owner,
            contract_address: Address::repeat_byte(0xcc),
            last_tx_hash: B256::repeat_byte(token_id as u8),
            observed_at: Utc::now(),
        }
    }

    async fn seeded() -> Arc<dyn OwnershipStore> {
        let wallet: Address = WALLET.parse().unwrap();
        let store = InMemoryOwnershipStore::new();
        store.upsert(&record(1, wallet)).await.unwrap();
        store.upsert(&record(5, Address::repeat_byte(0x22))).await.unwrap();
        store.upsert(&record(3, wallet)).await.unwrap();
        Arc::new(store)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn all_nfts_sorted_descending() {
        let (status, body) = get_json(router(seeded().await), "/nft").await;
        assert_eq!(status, StatusCode::OK);

        let nfts: Vec<NftResponse> = serde_json::from_value(body).unwrap();
        let ids: Vec<i64> = nfts.iter().map(|n| n.token_id).collect();
        assert_eq!(ids, vec![5, 3, 1]);
    }

    #[tokio::test]
    async fn wallet_nfts_filters_by_owner_case_insensitively() {
        let uri = format!("/nft/{}", WALLET.to_lowercase());
        let (status, body) = get_json(router(seeded().await), &uri).await;
        assert_eq!(status, StatusCode::OK);

        let nfts: Vec<NftResponse> = serde_json::from_value(body).unwrap();
        assert_eq!(nfts.len(), 2);
        assert_eq!(nfts[0].token_id, 3);
        assert_eq!(nfts[0].owner_address, WALLET);
    }

    #[tokio::test]
    async fn records_use_camel_case_fields() {
        let (_, body) = get_json(router(seeded().await), "/nft").await;
        let first = &body[0];
        assert_eq!(first["tokenId"], 5);
        assert!(first["ownerAddress"].is_string());
        assert!(first["contractAddress"].is_string());
        assert_eq!(first["txHash"], format!("0x{}", "05".repeat(32)));
        assert!(first["timestamp"].is_string());
    }

    #[tokio::test]
    async fn unknown_wallet_is_empty_list() {
        let uri = format!("/nft/{:#x}", Address::repeat_byte(0x99));
        let (status, body) = get_json(router(seeded().await), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn invalid_wallet_is_bad_request() {
        let (status, body) = get_json(router(seeded().await), "/nft/not-a-wallet").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("not-a-wallet"));
    }

    struct BrokenStore;

    #[async_trait]
    impl OwnershipStore for BrokenStore {
        async fn upsert(&self, _: &OwnershipRecord) -> Result<(), TrackerError> {
            Err(TrackerError::Store("down".into()))
        }
        async fn get(&self, _: i64) -> Result<Option<OwnershipRecord>, TrackerError> {
            Err(TrackerError::Store("down".into()))
        }
        async fn find_all(&self, _: TokenOrder) -> Result<Vec<OwnershipRecord>, TrackerError> {
            Err(TrackerError::Store("down".into()))
        }
        async fn find_by_owner(
            &self,
            _: &Address,
            _: TokenOrder,
        ) -> Result<Vec<OwnershipRecord>, TrackerError> {
            Err(TrackerError::Store("down".into()))
        }
        async fn count(&self) -> Result<u64, TrackerError> {
            Err(TrackerError::Store("down".into()))
        }
    }

    #[tokio::test]
    async fn store_failure_is_internal_error() {
        let (status, body) = get_json(router(Arc::new(BrokenStore)), "/nft").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());

        let uri = format!("/nft/{WALLET}");
        let (status, _) = get_json(router(Arc::new(BrokenStore)), &uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_reports_token_count() {
        let (status, body) = get_json(router(seeded().await), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let health: HealthResponse = serde_json::from_value(body).unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.tokens, 3);
    }
}
