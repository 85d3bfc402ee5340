//! API handlers and response shapes.

use crate::error::RpcError;
use axum::extract::{Query, State};
use axum::Json;
use drip_faucet::wallet::WALLET_STATUS_SLOT;
use drip_faucet::{ClaimPipeline, StatusBoard, StatusEntry, WalletManager};
use drip_store::SessionStore;
use drip_types::{ClaimStatus, SessionRecord, SessionStatus, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Shared state behind the API routes.
pub struct ApiState {
    pub pipeline: Arc<ClaimPipeline>,
    pub wallet: Arc<WalletManager>,
    pub store: Arc<dyn SessionStore>,
    pub status: Arc<StatusBoard>,
    pub queue_cache: QueueStatusCache,
}

/// Client-facing session status, returned by claim submission and status
/// lookups alike.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub session: String,
    pub status: SessionStatus,
    pub target_addr: String,
    pub amount: TokenAmount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_idx: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_status: Option<ClaimStatus>,
    /// The claim's failure text, when it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl SessionStatusResponse {
    pub fn from_record(record: SessionRecord) -> Self {
        let claim = record.claim;
        Self {
            session: record.session_id,
            status: record.status,
            target_addr: record.target_addr,
            amount: record.drop_amount,
            claim_idx: claim.as_ref().map(|c| c.claim_idx),
            claim_status: claim.as_ref().map(|c| c.status),
            claim_message: claim.as_ref().and_then(|c| c.tx_error.clone()),
            tx_hash: claim.as_ref().and_then(|c| c.tx_hash.clone()),
        }
    }
}

/// Aggregated queue snapshot.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatusResponse {
    pub queue_len: usize,
    pub pending_len: usize,
    pub processed_idx: u64,
    pub confirmed_idx: u64,
    pub queued_amount: TokenAmount,
    pub wallet_ready: bool,
    /// Wallet token balance rendered through `readable_amount`.
    pub wallet_balance_readable: String,
    /// The wallet monitor's current status slot, for operator dashboards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_status: Option<StatusEntry>,
}

/// Timestamped cache slot for the queue snapshot.
pub struct QueueStatusCache {
    lifetime_secs: u64,
    slot: Mutex<Option<(Timestamp, QueueStatusResponse)>>,
}

impl QueueStatusCache {
    pub fn new(lifetime_secs: u64) -> Self {
        Self {
            lifetime_secs,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached snapshot, or rebuild it via `build` when stale.
    pub fn get_or_build(
        &self,
        now: Timestamp,
        build: impl FnOnce() -> QueueStatusResponse,
    ) -> QueueStatusResponse {
        let mut slot = self.slot.lock().unwrap();
        if let Some((stamped, cached)) = slot.as_ref() {
            if !stamped.has_expired(self.lifetime_secs, now) {
                return cached.clone();
            }
        }
        let fresh = build();
        *slot = Some((now, fresh.clone()));
        fresh
    }
}

#[derive(Deserialize)]
pub struct ClaimRewardBody {
    pub session: String,
}

#[derive(Deserialize)]
pub struct SessionQuery {
    pub session: String,
}

/// `POST /api/claimReward`
pub async fn claim_reward(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<ClaimRewardBody>,
) -> Result<Json<SessionStatusResponse>, RpcError> {
    state
        .pipeline
        .create_claim(&body.session, Timestamp::now())?;
    session_response(&state, &body.session)
}

/// `GET /api/getSessionStatus?session=…`
pub async fn get_session_status(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionStatusResponse>, RpcError> {
    session_response(&state, &query.session)
}

fn session_response(
    state: &ApiState,
    session_id: &str,
) -> Result<Json<SessionStatusResponse>, RpcError> {
    let record = state
        .store
        .get_session(session_id)
        .map_err(drip_faucet::FaucetError::from)
        .map_err(RpcError::from)?
        .ok_or(RpcError::UnknownSession)?;
    Ok(Json(SessionStatusResponse::from_record(record)))
}

/// `GET /api/getQueueStatus` — cached for a few seconds.
pub async fn get_queue_status(State(state): State<Arc<ApiState>>) -> Json<QueueStatusResponse> {
    let snapshot = state.queue_cache.get_or_build(Timestamp::now(), || {
        build_queue_status(&state.pipeline, &state.wallet, &state.status)
    });
    Json(snapshot)
}

pub fn build_queue_status(
    pipeline: &ClaimPipeline,
    wallet: &WalletManager,
    status: &StatusBoard,
) -> QueueStatusResponse {
    let progress = pipeline.progress();
    let wallet_state = wallet.state();
    QueueStatusResponse {
        queue_len: pipeline.queue_len(),
        pending_len: pipeline.pending_len(),
        processed_idx: progress.processed_idx,
        confirmed_idx: progress.confirmed_idx,
        queued_amount: pipeline.queued_amount(),
        wallet_ready: wallet_state.ready,
        wallet_balance_readable: wallet.readable_amount(wallet_state.token_balance),
        wallet_status: status.get(WALLET_STATUS_SLOT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drip_types::Claim;

    fn snapshot(n: usize) -> QueueStatusResponse {
        QueueStatusResponse {
            queue_len: n,
            pending_len: 0,
            processed_idx: 0,
            confirmed_idx: 0,
            queued_amount: TokenAmount::ZERO,
            wallet_ready: true,
            wallet_balance_readable: "0 COSM".into(),
            wallet_status: None,
        }
    }

    #[test]
    fn cache_serves_within_lifetime() {
        let cache = QueueStatusCache::new(10);
        let first = cache.get_or_build(Timestamp::new(100), || snapshot(1));
        assert_eq!(first.queue_len, 1);

        // within lifetime: the builder must not run
        let second = cache.get_or_build(Timestamp::new(109), || panic!("should not rebuild"));
        assert_eq!(second.queue_len, 1);

        // expired: rebuilt
        let third = cache.get_or_build(Timestamp::new(110), || snapshot(2));
        assert_eq!(third.queue_len, 2);
    }

    #[test]
    fn session_response_surfaces_claim_failure() {
        let mut claim = Claim::new(4, Timestamp::new(10));
        claim.status = ClaimStatus::Failed;
        claim.tx_error = Some("Transaction failed".into());
        let record = SessionRecord {
            session_id: "s1".into(),
            status: SessionStatus::Finished,
            target_addr: "wasm1x".into(),
            drop_amount: TokenAmount::new(5),
            claim: Some(claim),
        };

        let response = SessionStatusResponse::from_record(record);
        assert_eq!(response.claim_status, Some(ClaimStatus::Failed));
        assert_eq!(response.claim_message.as_deref(), Some("Transaction failed"));
        assert_eq!(response.claim_idx, Some(4));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["claimStatus"], "failed");
        assert_eq!(json["claimMessage"], "Transaction failed");
    }

    #[test]
    fn session_response_omits_missing_claim_fields() {
        let record = SessionRecord {
            session_id: "s1".into(),
            status: SessionStatus::Claimable,
            target_addr: "wasm1x".into(),
            drop_amount: TokenAmount::new(5),
            claim: None,
        };
        let json = serde_json::to_value(SessionStatusResponse::from_record(record)).unwrap();
        assert!(json.get("claimIdx").is_none());
        assert!(json.get("claimStatus").is_none());
    }
}
