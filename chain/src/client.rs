//! Client traits the faucet core depends on.

use crate::error::ChainError;
use crate::types::{AccountEntry, BroadcastResult, Coin, StdFee, TxResult};
use async_trait::async_trait;

/// Read-only chain access.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Account metadata (sequence, account number).
    async fn account(&self, addr: &str) -> Result<AccountEntry, ChainError>;

    /// Bank balance of `addr` for one denom.
    async fn balance(&self, addr: &str, denom: &str) -> Result<drip_types::TokenAmount, ChainError>;

    /// Contract smart query; `msg` and the result are raw JSON.
    async fn smart_query(
        &self,
        contract: &str,
        msg: &serde_json::Value,
    ) -> Result<serde_json::Value, ChainError>;

    /// Single-shot transaction lookup. `Ok(None)` means not yet included.
    async fn tx(&self, hash: &str) -> Result<Option<TxResult>, ChainError>;
}

/// Signing access bound to one hot-wallet identity.
#[async_trait]
pub trait SigningClient: Send + Sync {
    /// The wallet's own address.
    fn address(&self) -> &str;

    /// Bank send from the wallet to `to`.
    async fn bank_send(
        &self,
        to: &str,
        amount: Vec<Coin>,
        fee: &StdFee,
    ) -> Result<BroadcastResult, ChainError>;

    /// Execute a contract message, optionally attaching funds.
    async fn execute_contract(
        &self,
        contract: &str,
        msg: &serde_json::Value,
        funds: Vec<Coin>,
        fee: &StdFee,
    ) -> Result<BroadcastResult, ChainError>;
}
