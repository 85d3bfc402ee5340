//! Refill controller — keeps the wallet's available balance in band.
//!
//! Available balance is the wallet's token balance minus everything already
//! committed: drops promised to live sessions and drops sitting in the claim
//! queue. When it falls below the lower band edge the controller withdraws
//! from the treasury contract; when it exceeds the upper edge the surplus is
//! deposited back.

use crate::config::FaucetConfig;
use crate::error::FaucetError;
use crate::pipeline::ClaimPipeline;
use crate::wallet::WalletManager;
use drip_chain::{Coin, QueryClient, StdFee};
use drip_store::SessionStore;
use drip_types::{RefillState, Timestamp, TokenAmount};
use drip_utils::format_duration;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Minimum spacing between any two refill attempts, regardless of outcome.
const ATTEMPT_COOLDOWN_SECS: u64 = 60;

/// What one controller invocation decided to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefillAction {
    /// Withdraw the configured refill amount from the treasury.
    Refill,
    /// Deposit the surplus back to the treasury.
    Overflow(TokenAmount),
    /// Balance is inside the band.
    None,
}

/// Result of one controller invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefillOutcome {
    /// Controller is disabled or has no treasury contract.
    Disabled,
    /// Another invocation is still running.
    AlreadyRunning,
    /// A cooldown window has not elapsed yet.
    CooledDown,
    /// Balance was in band; nothing to do.
    InBand,
    /// A withdraw was broadcast and confirmed.
    Refilled,
    /// A deposit was broadcast and confirmed.
    Overflowed,
}

/// Pick the action for a given available balance.
pub fn decide(
    available: TokenAmount,
    threshold: TokenAmount,
    overflow_amount: TokenAmount,
) -> RefillAction {
    if available > overflow_amount {
        RefillAction::Overflow(available.saturating_sub(overflow_amount))
    } else if available < threshold {
        RefillAction::Refill
    } else {
        RefillAction::None
    }
}

pub struct RefillController {
    config: Arc<FaucetConfig>,
    wallet: Arc<WalletManager>,
    store: Arc<dyn SessionStore>,
    pipeline: Arc<ClaimPipeline>,
    query: Arc<dyn QueryClient>,
    state: Mutex<RefillState>,
}

impl RefillController {
    pub fn new(
        config: Arc<FaucetConfig>,
        wallet: Arc<WalletManager>,
        store: Arc<dyn SessionStore>,
        pipeline: Arc<ClaimPipeline>,
        query: Arc<dyn QueryClient>,
    ) -> Self {
        Self {
            config,
            wallet,
            store,
            pipeline,
            query,
            state: Mutex::new(RefillState::default()),
        }
    }

    pub fn state(&self) -> RefillState {
        *self.state.lock().unwrap()
    }

    /// Wallet token balance minus committed-but-unsettled amounts.
    pub fn available_balance(&self) -> Result<TokenAmount, FaucetError> {
        let unclaimed = self.store.unclaimed_balance()?;
        let queued = self.pipeline.queued_amount();
        Ok(self
            .wallet
            .state()
            .token_balance
            .saturating_sub(unclaimed)
            .saturating_sub(queued))
    }

    /// One controller invocation. Single-flight; gated by the attempt and
    /// success cooldowns. Failures are logged by the caller and never retried
    /// here — the next scheduled invocation is the retry.
    pub async fn run_once(&self, now: Timestamp) -> Result<RefillOutcome, FaucetError> {
        let Some(contract) = self.contract() else {
            return Ok(RefillOutcome::Disabled);
        };

        {
            let mut state = self.state.lock().unwrap();
            if state.in_flight {
                return Ok(RefillOutcome::AlreadyRunning);
            }
            if !state.last_attempt.has_expired(ATTEMPT_COOLDOWN_SECS, now)
                && state.last_attempt != Timestamp::EPOCH
            {
                return Ok(RefillOutcome::CooledDown);
            }
            if !state.last_success.has_expired(self.config.refill_cooldown, now)
                && state.last_success != Timestamp::EPOCH
            {
                let remaining = state
                    .last_success
                    .as_secs()
                    .saturating_add(self.config.refill_cooldown)
                    .saturating_sub(now.as_secs());
                tracing::debug!(
                    remaining = %format_duration(remaining),
                    "refill suppressed by success cooldown"
                );
                return Ok(RefillOutcome::CooledDown);
            }
            state.in_flight = true;
            state.last_attempt = now;
        }

        let result = self.execute(&contract, now).await;
        if result.is_err() {
            self.state.lock().unwrap().in_flight = false;
        }
        result
    }

    async fn execute(&self, contract: &str, now: Timestamp) -> Result<RefillOutcome, FaucetError> {
        let available = match self.available_balance() {
            Ok(a) => a,
            Err(e) => {
                self.state.lock().unwrap().in_flight = false;
                return Err(e);
            }
        };

        let action = decide(
            available,
            self.config.refill_threshold,
            self.config.refill_overflow_amount,
        );

        let (msg, funds, outcome) = match action {
            RefillAction::None => {
                self.state.lock().unwrap().in_flight = false;
                return Ok(RefillOutcome::InBand);
            }
            RefillAction::Refill => (
                serde_json::json!({
                    "withdraw": { "amount": self.config.refill_amount.to_string() }
                }),
                Vec::new(),
                RefillOutcome::Refilled,
            ),
            RefillAction::Overflow(surplus) => (
                serde_json::json!({ "deposit": {} }),
                vec![Coin::new(self.config.denom.clone(), surplus)],
                RefillOutcome::Overflowed,
            ),
        };

        tracing::info!(%available, ?action, "refill action triggered");

        let fee = self.fee();
        let broadcast = self.wallet.execute_contract(contract, &msg, funds, fee).await?;
        self.await_confirmation(&broadcast.tx_hash).await?;

        {
            let mut state = self.state.lock().unwrap();
            state.last_success = now;
            state.in_flight = false;
        }
        if let Err(e) = self.wallet.load_wallet_state().await {
            tracing::warn!(error = %e, "post-refill wallet refresh failed");
        }
        Ok(outcome)
    }

    /// Poll the treasury transaction until inclusion or the wait ceiling.
    async fn await_confirmation(&self, tx_hash: &str) -> Result<(), FaucetError> {
        let poll = Duration::from_secs(self.config.confirm_poll_secs.max(1));
        let deadline = tokio::time::Instant::now()
            + Duration::from_secs(self.config.confirm_timeout_secs);
        loop {
            match self.query.tx(tx_hash).await {
                Ok(Some(result)) if result.succeeded() => return Ok(()),
                Ok(Some(result)) => {
                    return Err(FaucetError::TxBroadcast(format!(
                        "treasury transaction failed with code {}",
                        result.code
                    )));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(%tx_hash, error = %e, "refill confirmation poll failed");
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(FaucetError::TxBroadcast(
                    "treasury transaction confirmation timeout".into(),
                ));
            }
            tokio::time::sleep(poll).await;
        }
    }

    fn contract(&self) -> Option<String> {
        if !self.config.refill_enabled {
            return None;
        }
        self.config.refill_contract.clone()
    }

    fn fee(&self) -> StdFee {
        StdFee::new(
            vec![Coin::new(self.config.denom.clone(), self.config.gas_amount)],
            self.config.gas_limit,
        )
    }

    /// Background timer invoking the controller.
    pub fn spawn_timer(
        self: &Arc<Self>,
        period_secs: u64,
        mut shutdown: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(period_secs.max(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = controller.run_once(Timestamp::now()).await {
                            tracing::warn!(error = %e, "refill attempt failed");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    }
}
