//! End-to-end settlement scenarios against the nullable chain and store.

use drip_faucet::{ClaimPipeline, FaucetConfig, FaucetStats, StatusBoard, WalletManager};
use drip_nullables::{NullChainClient, NullSessionStore};
use drip_store::session::SessionStore;
use drip_types::{
    Claim, ClaimStatus, Progress, SessionRecord, SessionStatus, Timestamp, TokenAmount,
};
use drip_websocket::{NotificationHub, SinkMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Harness {
    pipeline: Arc<ClaimPipeline>,
    chain: Arc<NullChainClient>,
    store: Arc<NullSessionStore>,
    hub: Arc<NotificationHub>,
    wallet: Arc<WalletManager>,
    stats: Arc<FaucetStats>,
}

fn harness() -> Harness {
    let config = Arc::new(FaucetConfig {
        address_prefix: "wasm".into(),
        denom: "ucosm".into(),
        decimals: 6,
        is_native_token: true,
        gas_amount: TokenAmount::new(200),
        min_gas_amount: TokenAmount::new(200),
        min_amount: TokenAmount::new(1_000),
        max_amount: TokenAmount::new(10_000_000),
        max_pending: 5,
        confirm_poll_secs: 1,
        confirm_timeout_secs: 10,
        ..FaucetConfig::default()
    });
    let chain = Arc::new(NullChainClient::new("wasm1faucet"));
    let store = Arc::new(NullSessionStore::new());
    let hub = Arc::new(NotificationHub::new(120));
    let stats = Arc::new(FaucetStats::new());
    let wallet = Arc::new(WalletManager::new(
        config.clone(),
        chain.clone(),
        chain.clone(),
        Arc::new(StatusBoard::new()),
    ));
    let pipeline = Arc::new(ClaimPipeline::new(
        config,
        store.clone(),
        wallet.clone(),
        chain.clone(),
        hub.clone(),
        Vec::new(),
        stats.clone(),
    ));
    Harness {
        pipeline,
        chain,
        store,
        hub,
        wallet,
        stats,
    }
}

async fn fund(h: &Harness, native: u128) {
    h.chain
        .set_balance("wasm1faucet", "ucosm", TokenAmount::new(native));
    h.wallet.load_wallet_state().await.unwrap();
}

fn claimable(id: &str, amount: u128) -> SessionRecord {
    SessionRecord {
        session_id: id.to_string(),
        status: SessionStatus::Claimable,
        target_addr: "wasm1recipient".into(),
        drop_amount: TokenAmount::new(amount),
        claim: None,
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SinkMessage>) -> Vec<SinkMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

/// Let spawned watcher tasks run (paused clock auto-advances through sleeps).
async fn settle_watchers() {
    tokio::time::sleep(Duration::from_secs(2)).await;
}

#[tokio::test(start_paused = true)]
async fn happy_path_native_claim_settles_end_to_end() {
    let h = harness();
    fund(&h, 1_000_000_000).await;
    h.store.seed(claimable("S1", 1_000_000));

    let info = h.pipeline.create_claim("S1", Timestamp::new(100)).unwrap();
    assert_eq!(info.claim.claim_idx, 1);
    assert_eq!(h.pipeline.queue_len(), 1);

    // a client subscribed to this claim's progress
    let (tx, mut rx) = mpsc::unbounded_channel();
    h.hub.subscribe(1, tx, Timestamp::new(100));

    h.pipeline.tick(Timestamp::new(100)).await;

    assert_eq!(h.pipeline.queue_len(), 0);
    assert_eq!(h.pipeline.pending_len(), 1);
    assert_eq!(
        drain(&mut rx),
        vec![SinkMessage::Update(Progress::new(1, 0))]
    );

    // chain includes the transaction; the watcher picks it up
    h.chain.set_tx_result("TX-1", 4_200, 0);
    settle_watchers().await;

    assert_eq!(h.pipeline.pending_len(), 0);
    assert!(h.pipeline.live_claim("S1").is_none());
    assert_eq!(h.pipeline.progress(), Progress::new(1, 1));

    let msgs = drain(&mut rx);
    assert!(msgs.contains(&SinkMessage::Update(Progress::new(1, 1))));
    assert_eq!(
        msgs.last(),
        Some(&SinkMessage::Close("claim confirmed".to_string()))
    );

    // history keeps the settled claim for status queries
    let history = h.pipeline.transaction_queue(false);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].claim.status, ClaimStatus::Confirmed);
    assert_eq!(history[0].claim.tx_height, Some(4_200));

    let stored = h.store.get_session("S1").unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Finished);
    assert_eq!(h.stats.claims_confirmed(), 1);
    assert_eq!(h.stats.dispensed(), TokenAmount::new(1_000_000));
}

#[tokio::test(start_paused = true)]
async fn gas_exhaustion_leaves_claim_queued_without_broadcast() {
    let h = harness();
    fund(&h, 200).await; // exactly min_gas_amount
    h.store.seed(claimable("S2", 1_000_000));
    h.pipeline.create_claim("S2", Timestamp::new(100)).unwrap();

    h.pipeline.tick(Timestamp::new(100)).await;

    assert_eq!(h.pipeline.queue_len(), 1);
    assert_eq!(h.pipeline.pending_len(), 0);
    assert_eq!(h.hub.last_broadcast(), None);
    assert!(h.chain.transfers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_on_chain_execution_fails_claim() {
    let h = harness();
    fund(&h, 1_000_000_000).await;
    h.store.seed(claimable("S1", 1_000_000));
    h.pipeline.create_claim("S1", Timestamp::new(100)).unwrap();
    h.pipeline.tick(Timestamp::new(100)).await;

    // the chain included the transaction but execution failed
    h.chain.set_tx_result("TX-1", 4_201, 11);
    settle_watchers().await;

    assert_eq!(h.pipeline.pending_len(), 0);
    assert!(h.pipeline.live_claim("S1").is_none());
    // failures never raise the confirmed watermark
    assert_eq!(h.pipeline.progress(), Progress::new(1, 0));

    let stored = h.store.get_session("S1").unwrap().unwrap();
    let claim = stored.claim.unwrap();
    assert_eq!(claim.status, ClaimStatus::Failed);
    assert!(claim.tx_error.unwrap().contains("Transaction failed"));
    assert_eq!(h.stats.claims_failed(), 1);
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_transaction_times_out() {
    let h = harness();
    fund(&h, 1_000_000_000).await;
    h.store.seed(claimable("S1", 1_000_000));
    h.pipeline.create_claim("S1", Timestamp::new(100)).unwrap();
    h.pipeline.tick(Timestamp::new(100)).await;

    // no tx result ever appears; wait past the confirmation ceiling
    tokio::time::sleep(Duration::from_secs(15)).await;

    assert_eq!(h.pipeline.pending_len(), 0);
    let stored = h.store.get_session("S1").unwrap().unwrap();
    let claim = stored.claim.unwrap();
    assert_eq!(claim.status, ClaimStatus::Failed);
    assert_eq!(claim.tx_error.as_deref(), Some("confirmation timeout"));
}

#[tokio::test(start_paused = true)]
async fn recovery_rebinds_watchers_to_persisted_hashes() {
    let h = harness();
    fund(&h, 1_000_000_000).await;

    let mut processing = Claim::new(7, Timestamp::new(50));
    processing.status = ClaimStatus::Processing;
    let mut pending = Claim::new(8, Timestamp::new(60));
    pending.status = ClaimStatus::Pending;
    pending.tx_hash = Some("0xAB".into());

    h.store.seed(SessionRecord {
        session_id: "S3".into(),
        status: SessionStatus::Claiming,
        target_addr: "wasm1recipient".into(),
        drop_amount: TokenAmount::new(1_000_000),
        claim: Some(processing),
    });
    h.store.seed(SessionRecord {
        session_id: "S4".into(),
        status: SessionStatus::Claiming,
        target_addr: "wasm1recipient".into(),
        drop_amount: TokenAmount::new(2_000_000),
        claim: Some(pending),
    });

    let restored = h.pipeline.restore().unwrap();
    assert_eq!(restored, 2);
    assert_eq!(h.pipeline.queue_len(), 1);
    assert_eq!(h.pipeline.pending_len(), 1);

    // the watcher restored for S4 is live and bound to the persisted hash
    h.chain.set_tx_result("0xAB", 9_000, 0);
    settle_watchers().await;

    assert_eq!(h.pipeline.pending_len(), 0);
    assert!(h.pipeline.live_claim("S4").is_none());
    assert_eq!(h.store.get_session("S4").unwrap().unwrap().status, SessionStatus::Finished);

    // the queued claim is processed on the next tick, with fresh indices
    // continuing after the restored maximum
    h.store.seed(claimable("S5", 1_000_000));
    let next = h.pipeline.create_claim("S5", Timestamp::new(200)).unwrap();
    assert_eq!(next.claim.claim_idx, 9);
}

#[tokio::test(start_paused = true)]
async fn pending_bound_reopens_after_confirmations() {
    let h = harness();
    fund(&h, 1_000_000_000).await;

    // more claims than max_pending
    for i in 0..7 {
        let id = format!("S{i}");
        h.store.seed(claimable(&id, 1_000_000));
        h.pipeline.create_claim(&id, Timestamp::new(100)).unwrap();
    }

    h.pipeline.tick(Timestamp::new(100)).await;
    assert_eq!(h.pipeline.pending_len(), 5);
    assert_eq!(h.pipeline.queue_len(), 2);

    // confirm everything broadcast so far
    for n in 1..=5 {
        h.chain.set_tx_result(&format!("TX-{n}"), 100 + n, 0);
    }
    settle_watchers().await;
    assert_eq!(h.pipeline.pending_len(), 0);

    h.pipeline.tick(Timestamp::new(110)).await;
    assert_eq!(h.pipeline.queue_len(), 0);
    assert_eq!(h.pipeline.pending_len(), 2);
    assert_eq!(h.pipeline.progress(), Progress::new(7, 5));
}
