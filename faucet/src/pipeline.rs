//! Claim settlement pipeline.
//!
//! Owns the FIFO claim queue, the pending set awaiting chain confirmation,
//! and the recent-history map for status queries. A 2-second tick drains the
//! queue through the wallet while `|pending|` stays under the configured
//! bound; an independent watcher task follows each broadcast transaction
//! until it confirms, fails, or times out.
//!
//! Locking: all collections sit behind one mutex, which is never held across
//! a chain RPC or a store call. Claims are cheap to clone; consumers get
//! snapshots.

use crate::config::FaucetConfig;
use crate::error::FaucetError;
use crate::hooks::ClaimHook;
use crate::stats::FaucetStats;
use crate::wallet::WalletManager;
use drip_chain::QueryClient;
use drip_store::SessionStore;
use drip_types::{Claim, ClaimInfo, ClaimStatus, Progress, SessionStatus, Timestamp, TokenAmount};
use drip_websocket::NotificationHub;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Failure text when the wallet is unreachable at processing time.
const ERR_RPC_UNREACHABLE: &str = "Network RPC is currently unreachable.";
/// Failure text when the wallet cannot pay for gas.
const ERR_OUT_OF_GAS: &str = "Faucet wallet is out of gas funds.";
/// Failure text for an on-chain execution failure (non-zero code).
const ERR_TX_FAILED: &str = "Transaction failed";
/// Failure text when the confirmation wait ceiling elapses.
const ERR_CONFIRM_TIMEOUT: &str = "confirmation timeout";

/// Outcome of processing one dequeued claim.
enum ProcessOutcome {
    /// Broadcast succeeded; the claim is pending under `tx_hash`.
    Broadcast { info: ClaimInfo, tx_hash: String },
    /// The claim failed before or at broadcast.
    Failed { info: ClaimInfo, error: String },
}

struct HistoryEntry {
    info: ClaimInfo,
    settled_at: Timestamp,
}

#[derive(Default)]
struct PipelineState {
    /// Claims waiting for broadcast, ascending by claim index.
    queue: VecDeque<ClaimInfo>,
    /// Live (non-terminal) claims by session, for double-claim detection.
    by_session: HashMap<String, ClaimInfo>,
    /// Broadcast claims awaiting confirmation, by transaction hash.
    pending: HashMap<String, ClaimInfo>,
    /// Settled claims kept around for status queries.
    history: BTreeMap<u64, HistoryEntry>,
    /// Claim index of the most recently dequeued claim. Non-decreasing.
    last_processed_idx: u64,
    /// Highest confirmed claim index. Non-decreasing.
    last_confirmed_idx: u64,
    next_claim_idx: u64,
}

pub struct ClaimPipeline {
    config: Arc<FaucetConfig>,
    store: Arc<dyn SessionStore>,
    wallet: Arc<WalletManager>,
    query: Arc<dyn QueryClient>,
    hub: Arc<NotificationHub>,
    hooks: Vec<Arc<dyn ClaimHook>>,
    stats: Arc<FaucetStats>,
    state: Mutex<PipelineState>,
    tick_running: AtomicBool,
    disposed: AtomicBool,
}

impl ClaimPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<FaucetConfig>,
        store: Arc<dyn SessionStore>,
        wallet: Arc<WalletManager>,
        query: Arc<dyn QueryClient>,
        hub: Arc<NotificationHub>,
        hooks: Vec<Arc<dyn ClaimHook>>,
        stats: Arc<FaucetStats>,
    ) -> Self {
        let mut state = PipelineState::default();
        state.next_claim_idx = 1;
        Self {
            config,
            store,
            wallet,
            query,
            hub,
            hooks,
            stats,
            state: Mutex::new(state),
            tick_running: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    // ── Startup recovery ───────────────────────────────────────────────

    /// Reinstate persisted mid-claim sessions after a restart.
    ///
    /// Queued and processing claims go back to the queue; pending claims
    /// with a transaction hash get a fresh confirmation watcher. Anything
    /// else is logged and dropped. Returns the number of reinstated claims.
    pub fn restore(self: &Arc<Self>) -> Result<usize, FaucetError> {
        let sessions = self.store.get_sessions(SessionStatus::Claiming)?;
        let mut watchers = Vec::new();
        let mut restored = 0usize;
        {
            let mut st = self.state.lock().unwrap();
            for record in sessions {
                let Some(claim) = record.claim else {
                    tracing::error!(
                        session = %record.session_id,
                        "claiming session has no claim record, dropping"
                    );
                    continue;
                };
                let info = ClaimInfo {
                    session_id: record.session_id,
                    target_addr: record.target_addr,
                    amount: record.drop_amount,
                    claim,
                };
                match info.claim.status {
                    ClaimStatus::Queue | ClaimStatus::Processing => {
                        st.by_session.insert(info.session_id.clone(), info.clone());
                        st.queue.push_back(info);
                        restored += 1;
                    }
                    ClaimStatus::Pending => match info.claim.tx_hash.clone() {
                        Some(tx_hash) => {
                            st.last_processed_idx =
                                st.last_processed_idx.max(info.claim.claim_idx);
                            st.by_session.insert(info.session_id.clone(), info.clone());
                            st.pending.insert(tx_hash.clone(), info);
                            watchers.push(tx_hash);
                            restored += 1;
                        }
                        None => {
                            tracing::error!(
                                session = %info.session_id,
                                "pending claim without a transaction hash, dropping"
                            );
                        }
                    },
                    other => {
                        tracing::error!(
                            session = %info.session_id,
                            status = ?other,
                            "unexpected claim status during recovery, dropping"
                        );
                    }
                }
            }
            st.queue.make_contiguous().sort_by_key(|c| c.claim.claim_idx);
            let max_idx = st
                .queue
                .iter()
                .chain(st.pending.values())
                .map(|c| c.claim.claim_idx)
                .max();
            st.next_claim_idx = max_idx.map(|m| m + 1).unwrap_or(1);
        }
        for tx_hash in watchers {
            self.spawn_watcher(tx_hash);
        }
        tracing::info!(restored, "claim pipeline state restored");
        Ok(restored)
    }

    // ── Claim creation ─────────────────────────────────────────────────

    /// Validate and enqueue a claim for a claimable session.
    ///
    /// Precondition order: session status, amount band, address prefix,
    /// double-claim. The session slot is reserved under the pipeline lock
    /// before the hook chain runs, so concurrent calls for the same session
    /// resolve to exactly one winner.
    pub fn create_claim(&self, session_id: &str, now: Timestamp) -> Result<ClaimInfo, FaucetError> {
        let mut record = self
            .store
            .get_session(session_id)?
            .ok_or(FaucetError::NotClaimable)?;
        if record.status != SessionStatus::Claimable {
            return Err(FaucetError::NotClaimable);
        }
        if record.drop_amount < self.config.min_amount {
            return Err(FaucetError::AmountTooLow);
        }
        if record.drop_amount > self.config.max_amount {
            return Err(FaucetError::AmountTooHigh);
        }
        if !record.target_addr.starts_with(&self.config.address_prefix) {
            return Err(FaucetError::InvalidAddress);
        }

        let info = {
            let mut st = self.state.lock().unwrap();
            if st.by_session.contains_key(session_id) {
                return Err(FaucetError::RaceClaiming);
            }
            let claim_idx = st.next_claim_idx;
            st.next_claim_idx += 1;
            let info = ClaimInfo {
                session_id: session_id.to_string(),
                target_addr: record.target_addr.clone(),
                amount: record.drop_amount,
                claim: Claim::new(claim_idx, now),
            };
            st.by_session.insert(session_id.to_string(), info.clone());
            info
        };

        // Module hook chain: domain errors surface verbatim, anything else
        // is wrapped as an internal error.
        for hook in &self.hooks {
            if let Err(e) = hook.before_claim(&record) {
                self.state.lock().unwrap().by_session.remove(session_id);
                return Err(if e.is_client_visible() {
                    e
                } else {
                    FaucetError::Internal(e.to_string())
                });
            }
        }

        record.status = SessionStatus::Claiming;
        record.claim = Some(info.claim.clone());
        if let Err(e) = self.store.update_session(&record) {
            self.state.lock().unwrap().by_session.remove(session_id);
            return Err(e.into());
        }

        self.state.lock().unwrap().queue.push_back(info.clone());
        self.stats.record_created();
        tracing::info!(
            session = %session_id,
            claim_idx = info.claim.claim_idx,
            amount = %info.amount,
            "claim created"
        );
        Ok(info)
    }

    // ── Queue tick ─────────────────────────────────────────────────────

    /// One settlement round: purge expired history, drain the queue into the
    /// pending set while capacity and wallet funds allow, then publish the
    /// progress watermark if it moved. Single-flight: a tick that overlaps a
    /// still-running one returns immediately.
    pub async fn tick(self: &Arc<Self>, now: Timestamp) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        if self.tick_running.swap(true, Ordering::SeqCst) {
            return;
        }

        self.purge_history(now);

        loop {
            let next = {
                let mut st = self.state.lock().unwrap();
                if st.pending.len() >= self.config.max_pending {
                    None
                } else {
                    let wallet = self.wallet.state();
                    if !wallet.ready || wallet.native_balance <= self.config.min_gas_amount {
                        None
                    } else {
                        st.queue.pop_front().map(|info| {
                            st.last_processed_idx = info.claim.claim_idx;
                            info
                        })
                    }
                }
            };
            let Some(info) = next else { break };

            match self.process_one(info).await {
                ProcessOutcome::Broadcast { info, tx_hash } => {
                    {
                        let mut st = self.state.lock().unwrap();
                        st.by_session.insert(info.session_id.clone(), info.clone());
                        st.pending.insert(tx_hash.clone(), info.clone());
                    }
                    self.persist_claim(&info);
                    self.spawn_watcher(tx_hash);
                }
                ProcessOutcome::Failed { info, error } => {
                    self.settle_failed(info, &error, now);
                }
            }
        }

        self.emit_progress();
        self.tick_running.store(false, Ordering::SeqCst);
    }

    /// Attempt to broadcast one dequeued claim. Pure state-machine step: the
    /// caller settles failures and registers pending claims.
    async fn process_one(&self, mut info: ClaimInfo) -> ProcessOutcome {
        let wallet = self.wallet.state();
        if !wallet.ready {
            return ProcessOutcome::Failed {
                info,
                error: ERR_RPC_UNREACHABLE.to_string(),
            };
        }
        if wallet.native_balance <= self.config.min_gas_amount {
            return ProcessOutcome::Failed {
                info,
                error: ERR_OUT_OF_GAS.to_string(),
            };
        }

        info.claim.status = ClaimStatus::Processing;
        self.persist_claim(&info);

        match self.wallet.send_tokens(&info.target_addr, info.amount).await {
            Err(e) => ProcessOutcome::Failed {
                info,
                error: format!("Processing Exception: {e}"),
            },
            Ok(broadcast) => {
                info.claim.tx_hash = Some(broadcast.tx_hash.clone());
                info.claim.status = ClaimStatus::Pending;
                ProcessOutcome::Broadcast {
                    info,
                    tx_hash: broadcast.tx_hash,
                }
            }
        }
    }

    // ── Confirmation watchers ──────────────────────────────────────────

    fn spawn_watcher(self: &Arc<Self>, tx_hash: String) {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.watch_confirmation(tx_hash).await });
    }

    /// Poll the transaction until it is included, fails, or the wait ceiling
    /// elapses. Terminated only by resolution or process shutdown; its
    /// settlement writes are idempotent.
    async fn watch_confirmation(self: Arc<Self>, tx_hash: String) {
        let poll = Duration::from_secs(self.config.confirm_poll_secs.max(1));
        let deadline = tokio::time::Instant::now()
            + Duration::from_secs(self.config.confirm_timeout_secs);

        let outcome = loop {
            match self.query.tx(&tx_hash).await {
                Ok(Some(result)) => break Some(result),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(%tx_hash, error = %e, "confirmation poll failed");
                }
            }
            if tokio::time::Instant::now() >= deadline {
                break None;
            }
            tokio::time::sleep(poll).await;
        };

        let pending = {
            let st = self.state.lock().unwrap();
            st.pending.get(&tx_hash).cloned()
        };
        let Some(info) = pending else {
            // already settled elsewhere
            return;
        };

        let now = Timestamp::now();
        match outcome {
            Some(result) if result.succeeded() => {
                self.settle_confirmed(info, result.height, now);
            }
            Some(_) => self.settle_failed(info, ERR_TX_FAILED, now),
            None => self.settle_failed(info, ERR_CONFIRM_TIMEOUT, now),
        }
        self.emit_progress();
    }

    // ── Settlement ─────────────────────────────────────────────────────

    /// Move a claim to `Confirmed`: evict from the live maps, raise the
    /// confirmed watermark (never lower it), record history, persist, fire
    /// the claimed hooks and bump the stats.
    fn settle_confirmed(&self, mut info: ClaimInfo, height: u64, now: Timestamp) {
        info.claim.status = ClaimStatus::Confirmed;
        info.claim.tx_height = Some(height);
        info.claim.tx_fee = Some(self.config.gas_amount.to_string());
        {
            let mut st = self.state.lock().unwrap();
            if let Some(tx_hash) = &info.claim.tx_hash {
                st.pending.remove(tx_hash);
            }
            st.by_session.remove(&info.session_id);
            st.last_confirmed_idx = st.last_confirmed_idx.max(info.claim.claim_idx);
            st.history.insert(
                info.claim.claim_idx,
                HistoryEntry {
                    info: info.clone(),
                    settled_at: now,
                },
            );
        }
        self.persist_settled(&info);
        for hook in &self.hooks {
            hook.session_claimed(&info);
        }
        self.stats.record_confirmed(info.amount);
        tracing::info!(
            session = %info.session_id,
            claim_idx = info.claim.claim_idx,
            tx_hash = info.claim.tx_hash.as_deref().unwrap_or(""),
            "claim confirmed"
        );
    }

    /// Move a claim to `Failed`: same transitions as confirmation, except
    /// the watermark stays and the error is recorded on the claim.
    fn settle_failed(&self, mut info: ClaimInfo, error: &str, now: Timestamp) {
        info.claim.status = ClaimStatus::Failed;
        info.claim.tx_error = Some(error.to_string());
        {
            let mut st = self.state.lock().unwrap();
            if let Some(tx_hash) = &info.claim.tx_hash {
                st.pending.remove(tx_hash);
            }
            st.by_session.remove(&info.session_id);
            st.history.insert(
                info.claim.claim_idx,
                HistoryEntry {
                    info: info.clone(),
                    settled_at: now,
                },
            );
        }
        self.persist_settled(&info);
        self.stats.record_failed();
        tracing::warn!(
            session = %info.session_id,
            claim_idx = info.claim.claim_idx,
            error,
            "claim failed"
        );
    }

    // ── Persistence (errors logged, never propagated) ──────────────────

    fn persist_claim(&self, info: &ClaimInfo) {
        if let Err(e) = self.store.update_claim_data(&info.session_id, &info.claim) {
            tracing::warn!(session = %info.session_id, error = %e, "claim persist failed");
        }
    }

    fn persist_settled(&self, info: &ClaimInfo) {
        self.persist_claim(info);
        match self.store.get_session(&info.session_id) {
            Ok(Some(mut record)) => {
                record.status = SessionStatus::Finished;
                record.claim = Some(info.claim.clone());
                if let Err(e) = self.store.update_session(&record) {
                    tracing::warn!(session = %info.session_id, error = %e, "session persist failed");
                }
            }
            Ok(None) => {
                tracing::warn!(session = %info.session_id, "settled session missing from store");
            }
            Err(e) => {
                tracing::warn!(session = %info.session_id, error = %e, "session lookup failed");
            }
        }
    }

    // ── Progress & queries ─────────────────────────────────────────────

    /// Broadcast the watermark when it differs from the last broadcast.
    fn emit_progress(&self) {
        let progress = self.progress();
        let last = self.hub.last_broadcast();
        if last == Some(progress) {
            return;
        }
        if last.is_none() && progress == Progress::default() {
            return;
        }
        self.hub.broadcast(progress);
    }

    pub fn progress(&self) -> Progress {
        let st = self.state.lock().unwrap();
        Progress::new(st.last_processed_idx, st.last_confirmed_idx)
    }

    /// Sum of amounts committed to queued claims.
    pub fn queued_amount(&self) -> TokenAmount {
        let st = self.state.lock().unwrap();
        st.queue
            .iter()
            .fold(TokenAmount::ZERO, |acc, c| acc.saturating_add(c.amount))
    }

    /// Queue plus pending claims, plus settled history unless `queue_only`.
    pub fn transaction_queue(&self, queue_only: bool) -> Vec<ClaimInfo> {
        let st = self.state.lock().unwrap();
        let mut out: Vec<ClaimInfo> = st.queue.iter().cloned().collect();
        out.extend(st.pending.values().cloned());
        if !queue_only {
            out.extend(st.history.values().map(|e| e.info.clone()));
        }
        out
    }

    /// The live (non-terminal) claim for a session, if any.
    pub fn live_claim(&self, session_id: &str) -> Option<ClaimInfo> {
        self.state
            .lock()
            .unwrap()
            .by_session
            .get(session_id)
            .cloned()
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    fn purge_history(&self, now: Timestamp) {
        let retention = self.config.history_retention_secs;
        let mut st = self.state.lock().unwrap();
        st.history
            .retain(|_, entry| !entry.settled_at.has_expired(retention, now));
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Background tick driver.
    pub fn spawn_tick_task(
        self: &Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(
                pipeline.config.claim_tick_secs.max(1),
            ));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => pipeline.tick(Timestamp::now()).await,
                    _ = shutdown.recv() => {
                        pipeline.dispose();
                        break;
                    }
                }
            }
        })
    }

    /// Stop ticking and clear the hub's last broadcast. In-flight watchers
    /// are allowed to finish.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.hub.reset();
    }
}
