//! Faucet configuration with TOML file support.

use drip_types::TokenAmount;
use serde::{Deserialize, Serialize};

use crate::FaucetError;

/// Configuration for the claim-settlement daemon.
///
/// Can be loaded from a TOML file via [`FaucetConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every monetary threshold is a
/// base-unit integer string in the file; `decimals` governs display only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaucetConfig {
    /// Chain gateway endpoint.
    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    /// Bech32-style prefix recipient addresses must carry.
    #[serde(default = "default_address_prefix")]
    pub address_prefix: String,

    /// Mnemonic seed for the hot wallet.
    #[serde(default)]
    pub wallet_mnemonic: String,

    /// Gas price string, e.g. "0.025ucosm".
    #[serde(default = "default_gas_price")]
    pub gas_price: String,

    /// Native denom used for gas (and for the drop when `is_native_token`).
    #[serde(default = "default_denom")]
    pub denom: String,

    /// Display decimals of the faucet token.
    #[serde(default = "default_decimals")]
    pub decimals: u32,

    /// Display symbol of the faucet token.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Whether the faucet dispenses the native coin (vs. a contract token).
    #[serde(default = "default_true")]
    pub is_native_token: bool,

    /// CW20-style token contract, required when `is_native_token` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,

    /// Fee coin amount attached to every transaction.
    #[serde(default = "default_gas_amount")]
    pub gas_amount: TokenAmount,

    /// Gas limit attached to every transaction.
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,

    /// Claims stay queued while the native balance is at or below this.
    #[serde(default = "default_min_gas_amount")]
    pub min_gas_amount: TokenAmount,

    /// Smallest accepted drop.
    #[serde(default = "default_min_amount")]
    pub min_amount: TokenAmount,

    /// Largest accepted drop.
    #[serde(default = "default_max_amount")]
    pub max_amount: TokenAmount,

    /// Bound on claims awaiting chain confirmation.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,

    /// Below this token balance the faucet reports itself out of funds.
    #[serde(default = "default_min_balance")]
    pub min_balance: TokenAmount,

    /// Below this token balance the faucet warns about low funds.
    #[serde(default = "default_low_balance_threshold")]
    pub low_balance_threshold: TokenAmount,

    /// Whether the refill controller is active.
    #[serde(default)]
    pub refill_enabled: bool,

    /// Treasury contract the controller withdraws from / deposits to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refill_contract: Option<String>,

    /// Amount withdrawn per refill.
    #[serde(default = "default_refill_amount")]
    pub refill_amount: TokenAmount,

    /// Lower edge of the available-balance band.
    #[serde(default = "default_refill_threshold")]
    pub refill_threshold: TokenAmount,

    /// Upper edge of the available-balance band.
    #[serde(default = "default_refill_overflow_amount")]
    pub refill_overflow_amount: TokenAmount,

    /// Seconds between successful refills/overflows.
    #[serde(default = "default_refill_cooldown")]
    pub refill_cooldown: u64,

    // ── Ambient settings ───────────────────────────────────────────────
    /// HTTP API + WebSocket port.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Queue tick period.
    #[serde(default = "default_claim_tick_secs")]
    pub claim_tick_secs: u64,

    /// Wallet state refresh period.
    #[serde(default = "default_wallet_refresh_secs")]
    pub wallet_refresh_secs: u64,

    /// How long settled claims stay queryable.
    #[serde(default = "default_history_retention_secs")]
    pub history_retention_secs: u64,

    /// Confirmation poll period.
    #[serde(default = "default_confirm_poll_secs")]
    pub confirm_poll_secs: u64,

    /// Ceiling on the confirmation wait before a claim fails.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    /// Keepalive ping period for claim sockets.
    #[serde(default = "default_ws_ping_interval_secs")]
    pub ws_ping_interval_secs: u64,

    /// Silence window after which a claim socket is dropped.
    #[serde(default = "default_ws_ping_timeout_secs")]
    pub ws_ping_timeout_secs: u64,

    /// Queue status endpoint cache lifetime.
    #[serde(default = "default_queue_status_cache_secs")]
    pub queue_status_cache_secs: u64,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_rpc_host() -> String {
    "http://127.0.0.1:1317".to_string()
}

fn default_address_prefix() -> String {
    "wasm".to_string()
}

fn default_gas_price() -> String {
    "0.025ucosm".to_string()
}

fn default_denom() -> String {
    "ucosm".to_string()
}

fn default_decimals() -> u32 {
    6
}

fn default_symbol() -> String {
    "COSM".to_string()
}

fn default_true() -> bool {
    true
}

fn default_gas_amount() -> TokenAmount {
    TokenAmount::new(5_000)
}

fn default_gas_limit() -> u64 {
    200_000
}

fn default_min_gas_amount() -> TokenAmount {
    TokenAmount::new(100_000)
}

fn default_min_amount() -> TokenAmount {
    TokenAmount::new(1_000_000)
}

fn default_max_amount() -> TokenAmount {
    TokenAmount::new(10_000_000)
}

fn default_max_pending() -> usize {
    5
}

fn default_min_balance() -> TokenAmount {
    TokenAmount::new(10_000_000)
}

fn default_low_balance_threshold() -> TokenAmount {
    TokenAmount::new(100_000_000)
}

fn default_refill_amount() -> TokenAmount {
    TokenAmount::new(1_000_000_000)
}

fn default_refill_threshold() -> TokenAmount {
    TokenAmount::new(500_000_000)
}

fn default_refill_overflow_amount() -> TokenAmount {
    TokenAmount::new(5_000_000_000)
}

fn default_refill_cooldown() -> u64 {
    3_600
}

fn default_api_port() -> u16 {
    8787
}

fn default_claim_tick_secs() -> u64 {
    2
}

fn default_wallet_refresh_secs() -> u64 {
    30
}

fn default_history_retention_secs() -> u64 {
    1_800
}

fn default_confirm_poll_secs() -> u64 {
    2
}

fn default_confirm_timeout_secs() -> u64 {
    120
}

fn default_ws_ping_interval_secs() -> u64 {
    30
}

fn default_ws_ping_timeout_secs() -> u64 {
    120
}

fn default_queue_status_cache_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl FaucetConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, FaucetError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| FaucetError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, FaucetError> {
        let config: Self = toml::from_str(s).map_err(|e| FaucetError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("FaucetConfig is always serializable to TOML")
    }

    /// Cross-field checks that serde cannot express.
    pub fn validate(&self) -> Result<(), FaucetError> {
        if !self.is_native_token && self.contract_address.is_none() {
            return Err(FaucetError::Config(
                "contract_address is required when is_native_token is false".into(),
            ));
        }
        if self.min_amount > self.max_amount {
            return Err(FaucetError::Config(
                "min_amount must not exceed max_amount".into(),
            ));
        }
        if self.max_pending == 0 {
            return Err(FaucetError::Config("max_pending must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            rpc_host: default_rpc_host(),
            address_prefix: default_address_prefix(),
            wallet_mnemonic: String::new(),
            gas_price: default_gas_price(),
            denom: default_denom(),
            decimals: default_decimals(),
            symbol: default_symbol(),
            is_native_token: true,
            contract_address: None,
            gas_amount: default_gas_amount(),
            gas_limit: default_gas_limit(),
            min_gas_amount: default_min_gas_amount(),
            min_amount: default_min_amount(),
            max_amount: default_max_amount(),
            max_pending: default_max_pending(),
            min_balance: default_min_balance(),
            low_balance_threshold: default_low_balance_threshold(),
            refill_enabled: false,
            refill_contract: None,
            refill_amount: default_refill_amount(),
            refill_threshold: default_refill_threshold(),
            refill_overflow_amount: default_refill_overflow_amount(),
            refill_cooldown: default_refill_cooldown(),
            api_port: default_api_port(),
            claim_tick_secs: default_claim_tick_secs(),
            wallet_refresh_secs: default_wallet_refresh_secs(),
            history_retention_secs: default_history_retention_secs(),
            confirm_poll_secs: default_confirm_poll_secs(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            ws_ping_interval_secs: default_ws_ping_interval_secs(),
            ws_ping_timeout_secs: default_ws_ping_timeout_secs(),
            queue_status_cache_secs: default_queue_status_cache_secs(),
            log_level: default_log_level(),
        }
    }
}
