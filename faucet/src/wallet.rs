//! Wallet manager — hot-wallet state and transfer execution.
//!
//! Owns the signing identity and the read-only query client, publishes the
//! latest [`WalletState`] snapshot, and applies optimistic local debits after
//! each successful broadcast. The periodic [`WalletManager::load_wallet_state`]
//! refresh is the reconciling authority for those debits.

use crate::config::FaucetConfig;
use crate::error::FaucetError;
use crate::status::{StatusBoard, StatusLevel};
use drip_chain::{BroadcastResult, Coin, QueryClient, SigningClient, StdFee};
use drip_types::{Timestamp, TokenAmount, WalletState};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;

/// Status board slot owned by the wallet monitor.
pub const WALLET_STATUS_SLOT: &str = "wallet";

/// Delay before an initialization retry.
const INIT_RETRY_SECS: u64 = 5;

pub struct WalletManager {
    config: Arc<FaucetConfig>,
    signer: Arc<dyn SigningClient>,
    query: Arc<dyn QueryClient>,
    status: Arc<StatusBoard>,
    state: RwLock<WalletState>,
    /// Unix seconds of the last refresh attempt; 0 forces a re-evaluation.
    last_refresh_at: AtomicU64,
    initialized: AtomicBool,
    /// Guards the single retry task slot.
    retry_scheduled: AtomicBool,
    reload_tx: broadcast::Sender<()>,
}

impl WalletManager {
    pub fn new(
        config: Arc<FaucetConfig>,
        signer: Arc<dyn SigningClient>,
        query: Arc<dyn QueryClient>,
        status: Arc<StatusBoard>,
    ) -> Self {
        let (reload_tx, _) = broadcast::channel(1);
        Self {
            config,
            signer,
            query,
            status,
            state: RwLock::new(WalletState::not_ready()),
            last_refresh_at: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
            retry_scheduled: AtomicBool::new(false),
            reload_tx,
        }
    }

    /// The dispensing wallet's address.
    pub fn address(&self) -> &str {
        self.signer.address()
    }

    /// Copy of the current snapshot.
    pub fn state(&self) -> WalletState {
        *self.state.read().unwrap()
    }

    pub fn last_refresh_at(&self) -> Timestamp {
        Timestamp::new(self.last_refresh_at.load(Ordering::Relaxed))
    }

    /// First wallet state load. Idempotent; on failure the wallet stays
    /// `ready = false` and a single retry task keeps trying every
    /// [`INIT_RETRY_SECS`] until a load succeeds.
    pub async fn initialize(self: &Arc<Self>) {
        if self.initialized.load(Ordering::SeqCst) {
            return;
        }
        match self.load_wallet_state().await {
            Ok(()) => {
                self.initialized.store(true, Ordering::SeqCst);
                tracing::info!(address = %self.address(), "wallet initialized");
            }
            Err(e) => {
                tracing::warn!(error = %e, "wallet initialization failed, retrying in {INIT_RETRY_SECS}s");
                self.schedule_init_retry();
            }
        }
    }

    /// At most one retry task exists at a time; it loops until a load
    /// succeeds, so failures never stack up additional timers.
    fn schedule_init_retry(self: &Arc<Self>) {
        if self.retry_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let mgr = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(INIT_RETRY_SECS)).await;
                match mgr.load_wallet_state().await {
                    Ok(()) => {
                        mgr.initialized.store(true, Ordering::SeqCst);
                        tracing::info!(address = %mgr.address(), "wallet initialized after retry");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "wallet initialization retry failed");
                    }
                }
            }
            mgr.retry_scheduled.store(false, Ordering::SeqCst);
        });
    }

    /// Query sequence and balances, then publish a fresh snapshot.
    ///
    /// On any failure the published snapshot is `ready = false` with zeroed
    /// balances. `last_refresh_at` and the status slot are updated either
    /// way. Not single-flight; callers must not race it against itself.
    pub async fn load_wallet_state(&self) -> Result<(), FaucetError> {
        let result = self.fetch_state().await;
        match &result {
            Ok(state) => {
                *self.state.write().unwrap() = *state;
            }
            Err(e) => {
                tracing::warn!(error = %e, "wallet state refresh failed");
                *self.state.write().unwrap() = WalletState::not_ready();
            }
        }
        self.last_refresh_at
            .store(Timestamp::now().as_secs(), Ordering::Relaxed);
        self.publish_status();
        result.map(|_| ())
    }

    async fn fetch_state(&self) -> Result<WalletState, FaucetError> {
        let addr = self.signer.address();
        let account = self.query.account(addr).await?;
        let native_balance = self.query.balance(addr, &self.config.denom).await?;

        let token_balance = if self.config.is_native_token {
            native_balance
        } else {
            let contract = self.config.contract_address.as_deref().ok_or_else(|| {
                FaucetError::Config("contract_address missing for contract token".into())
            })?;
            let response = self
                .query
                .smart_query(contract, &serde_json::json!({ "balance": { "address": addr } }))
                .await?;
            response
                .get("balance")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    FaucetError::ChainRpc("balance query returned no balance field".into())
                })?
                .parse()
                .map_err(|e| FaucetError::ChainRpc(format!("invalid balance string: {e}")))?
        };

        Ok(WalletState {
            ready: true,
            sequence: account.sequence,
            token_balance,
            native_balance,
        })
    }

    /// Transfer `amount` of the faucet token to `recipient`.
    ///
    /// Native tokens go through a bank send, contract tokens through a
    /// `transfer` execute. On success the snapshot is debited locally so the
    /// pipeline can stay bounded without re-querying.
    pub async fn send_tokens(
        &self,
        recipient: &str,
        amount: TokenAmount,
    ) -> Result<BroadcastResult, FaucetError> {
        if !self.state().ready {
            return Err(FaucetError::WalletNotReady);
        }
        let fee = self.fee();

        let sent = if self.config.is_native_token {
            self.signer
                .bank_send(
                    recipient,
                    vec![Coin::new(self.config.denom.clone(), amount)],
                    &fee,
                )
                .await
        } else {
            let contract = self.config.contract_address.as_deref().ok_or_else(|| {
                FaucetError::Config("contract_address missing for contract token".into())
            })?;
            let msg = serde_json::json!({
                "transfer": { "recipient": recipient, "amount": amount.to_string() }
            });
            self.signer
                .execute_contract(contract, &msg, Vec::new(), &fee)
                .await
        };

        let broadcast = sent.map_err(|e| FaucetError::TxBroadcast(e.to_string()))?;

        {
            let mut state = self.state.write().unwrap();
            *state = state.debit_send(
                amount,
                self.config.gas_amount,
                self.config.is_native_token,
            );
        }
        tracing::debug!(recipient, %amount, tx_hash = %broadcast.tx_hash, "tokens sent");
        Ok(broadcast)
    }

    /// Execute an arbitrary contract message from the hot wallet.
    ///
    /// Debits only sequence and the fee coin; the token balance is left for
    /// the next refresh to reconcile.
    pub async fn execute_contract(
        &self,
        contract: &str,
        msg: &serde_json::Value,
        funds: Vec<Coin>,
        fee: StdFee,
    ) -> Result<BroadcastResult, FaucetError> {
        if !self.state().ready {
            return Err(FaucetError::WalletNotReady);
        }
        let broadcast = self
            .signer
            .execute_contract(contract, msg, funds, &fee)
            .await
            .map_err(|e| FaucetError::TxBroadcast(e.to_string()))?;

        {
            let mut state = self.state.write().unwrap();
            *state = state.debit_execute(fee.first_amount());
        }
        tracing::debug!(contract, tx_hash = %broadcast.tx_hash, "contract executed");
        Ok(broadcast)
    }

    /// Read-through balance query for an external address. No caching.
    pub async fn wallet_balance(&self, addr: &str) -> Result<TokenAmount, FaucetError> {
        Ok(self.query.balance(addr, &self.config.denom).await?)
    }

    /// The standard fee attached to faucet transactions.
    pub fn fee(&self) -> StdFee {
        StdFee::new(
            vec![Coin::new(self.config.denom.clone(), self.config.gas_amount)],
            self.config.gas_limit,
        )
    }

    /// Human-readable rendering of a base-unit amount.
    pub fn readable_amount(&self, amount: TokenAmount) -> String {
        format_units(amount, self.config.decimals, &self.config.symbol)
    }

    /// Ask the manager to rebuild its view of the chain. Resets
    /// `last_refresh_at` so downstream consumers re-evaluate immediately.
    pub fn signal_reload(&self) {
        let _ = self.reload_tx.send(());
    }

    /// Background task reacting to reload signals.
    pub fn spawn_reload_listener(
        self: &Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let mgr = Arc::clone(self);
        let mut reload_rx = self.reload_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = reload_rx.recv() => {
                        if msg.is_err() {
                            break;
                        }
                        mgr.last_refresh_at.store(0, Ordering::Relaxed);
                        if let Err(e) = mgr.load_wallet_state().await {
                            tracing::warn!(error = %e, "reload-triggered refresh failed");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    }

    /// Background task refreshing the snapshot on a fixed period.
    pub fn spawn_refresh_task(
        self: &Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let mgr = Arc::clone(self);
        let period = Duration::from_secs(self.config.wallet_refresh_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = mgr.load_wallet_state().await {
                            tracing::warn!(error = %e, "periodic wallet refresh failed");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    }

    /// Rewrite the wallet's status slot from the current snapshot.
    fn publish_status(&self) {
        let state = self.state();
        if !state.ready {
            self.status.set(
                WALLET_STATUS_SLOT,
                StatusLevel::Error,
                "Cannot connect to network",
            );
        } else if state.token_balance <= self.config.min_balance
            || state.native_balance <= self.config.min_gas_amount
        {
            self.status.set(
                WALLET_STATUS_SLOT,
                StatusLevel::Error,
                "The faucet is out of funds!",
            );
        } else if state.token_balance <= self.config.low_balance_threshold {
            self.status.set(
                WALLET_STATUS_SLOT,
                StatusLevel::Warning,
                format!(
                    "The faucet is running low on funds! Balance: {}",
                    self.readable_amount(state.token_balance)
                ),
            );
        } else {
            self.status.set(WALLET_STATUS_SLOT, StatusLevel::Info, "");
        }
    }
}

/// Format a base-unit amount as `whole.frac SYMBOL`, truncating (never
/// rounding) the fraction to at most 3 digits and trimming trailing zeros.
pub fn format_units(amount: TokenAmount, decimals: u32, symbol: &str) -> String {
    let raw = amount.raw();
    if decimals == 0 {
        return format!("{raw} {symbol}");
    }
    let scale = 10u128.pow(decimals);
    let whole = raw / scale;
    let frac = raw % scale;
    let frac3 = if decimals >= 3 {
        frac / 10u128.pow(decimals - 3)
    } else {
        frac * 10u128.pow(3 - decimals)
    };
    if frac3 == 0 {
        return format!("{whole} {symbol}");
    }
    let mut digits = format!("{frac3:03}");
    while digits.ends_with('0') {
        digits.pop();
    }
    format!("{whole}.{digits} {symbol}")
}
