//! Nullable chain client — scripted responses, recorded broadcasts.

use async_trait::async_trait;
use drip_chain::{
    AccountEntry, BroadcastResult, ChainError, Coin, QueryClient, SigningClient, StdFee, TxResult,
};
use drip_types::TokenAmount;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A recorded bank send.
#[derive(Clone, Debug)]
pub struct SentTransfer {
    pub to: String,
    pub amount: Vec<Coin>,
    pub fee: StdFee,
}

/// A recorded contract execution.
#[derive(Clone, Debug)]
pub struct SentExecute {
    pub contract: String,
    pub msg: serde_json::Value,
    pub funds: Vec<Coin>,
    pub fee: StdFee,
}

/// A test chain that records broadcasts instead of sending them.
///
/// Broadcasts succeed by default with generated hashes `TX-1`, `TX-2`, …
/// Queries answer from programmable tables. Failures are injected per
/// concern and stay active until cleared.
pub struct NullChainClient {
    address: String,
    sequence: AtomicU64,
    next_tx: AtomicU64,
    balances: Mutex<HashMap<(String, String), TokenAmount>>,
    smart_responses: Mutex<HashMap<String, serde_json::Value>>,
    tx_results: Mutex<HashMap<String, TxResult>>,
    transfers: Mutex<Vec<SentTransfer>>,
    executes: Mutex<Vec<SentExecute>>,
    broadcast_failure: Mutex<Option<String>>,
    query_failure: Mutex<Option<String>>,
}

impl NullChainClient {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            sequence: AtomicU64::new(1),
            next_tx: AtomicU64::new(1),
            balances: Mutex::new(HashMap::new()),
            smart_responses: Mutex::new(HashMap::new()),
            tx_results: Mutex::new(HashMap::new()),
            transfers: Mutex::new(Vec::new()),
            executes: Mutex::new(Vec::new()),
            broadcast_failure: Mutex::new(None),
            query_failure: Mutex::new(None),
        }
    }

    // ── Scripting ──────────────────────────────────────────────────────

    pub fn set_sequence(&self, sequence: u64) {
        self.sequence.store(sequence, Ordering::Relaxed);
    }

    pub fn set_balance(&self, addr: &str, denom: &str, amount: TokenAmount) {
        self.balances
            .lock()
            .unwrap()
            .insert((addr.to_string(), denom.to_string()), amount);
    }

    /// Script the answer for smart queries against `contract`.
    pub fn set_smart_response(&self, contract: &str, response: serde_json::Value) {
        self.smart_responses
            .lock()
            .unwrap()
            .insert(contract.to_string(), response);
    }

    /// Script the lookup result for a transaction hash.
    pub fn set_tx_result(&self, hash: &str, height: u64, code: u32) {
        self.tx_results.lock().unwrap().insert(
            hash.to_string(),
            TxResult {
                hash: hash.to_string(),
                height,
                code,
                raw_log: String::new(),
            },
        );
    }

    pub fn fail_broadcasts(&self, message: impl Into<String>) {
        *self.broadcast_failure.lock().unwrap() = Some(message.into());
    }

    pub fn fail_queries(&self, message: impl Into<String>) {
        *self.query_failure.lock().unwrap() = Some(message.into());
    }

    pub fn heal(&self) {
        *self.broadcast_failure.lock().unwrap() = None;
        *self.query_failure.lock().unwrap() = None;
    }

    // ── Assertions ─────────────────────────────────────────────────────

    pub fn transfers(&self) -> Vec<SentTransfer> {
        self.transfers.lock().unwrap().clone()
    }

    pub fn executes(&self) -> Vec<SentExecute> {
        self.executes.lock().unwrap().clone()
    }

    fn next_hash(&self) -> String {
        format!("TX-{}", self.next_tx.fetch_add(1, Ordering::Relaxed))
    }

    fn check_broadcast(&self) -> Result<(), ChainError> {
        match self.broadcast_failure.lock().unwrap().as_ref() {
            Some(msg) => Err(ChainError::Broadcast(msg.clone())),
            None => Ok(()),
        }
    }

    fn check_query(&self) -> Result<(), ChainError> {
        match self.query_failure.lock().unwrap().as_ref() {
            Some(msg) => Err(ChainError::Rpc(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QueryClient for NullChainClient {
    async fn account(&self, _addr: &str) -> Result<AccountEntry, ChainError> {
        self.check_query()?;
        Ok(AccountEntry {
            account_number: 1,
            sequence: self.sequence.load(Ordering::Relaxed),
        })
    }

    async fn balance(&self, addr: &str, denom: &str) -> Result<TokenAmount, ChainError> {
        self.check_query()?;
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&(addr.to_string(), denom.to_string()))
            .copied()
            .unwrap_or(TokenAmount::ZERO))
    }

    async fn smart_query(
        &self,
        contract: &str,
        _msg: &serde_json::Value,
    ) -> Result<serde_json::Value, ChainError> {
        self.check_query()?;
        self.smart_responses
            .lock()
            .unwrap()
            .get(contract)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("contract {contract}")))
    }

    async fn tx(&self, hash: &str) -> Result<Option<TxResult>, ChainError> {
        self.check_query()?;
        Ok(self.tx_results.lock().unwrap().get(hash).cloned())
    }
}

#[async_trait]
impl SigningClient for NullChainClient {
    fn address(&self) -> &str {
        &self.address
    }

    async fn bank_send(
        &self,
        to: &str,
        amount: Vec<Coin>,
        fee: &StdFee,
    ) -> Result<BroadcastResult, ChainError> {
        self.check_broadcast()?;
        self.transfers.lock().unwrap().push(SentTransfer {
            to: to.to_string(),
            amount,
            fee: fee.clone(),
        });
        self.sequence.fetch_add(1, Ordering::Relaxed);
        Ok(BroadcastResult {
            tx_hash: self.next_hash(),
        })
    }

    async fn execute_contract(
        &self,
        contract: &str,
        msg: &serde_json::Value,
        funds: Vec<Coin>,
        fee: &StdFee,
    ) -> Result<BroadcastResult, ChainError> {
        self.check_broadcast()?;
        self.executes.lock().unwrap().push(SentExecute {
            contract: contract.to_string(),
            msg: msg.clone(),
            funds,
            fee: fee.clone(),
        });
        self.sequence.fetch_add(1, Ordering::Relaxed);
        Ok(BroadcastResult {
            tx_hash: self.next_hash(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcasts_are_recorded_with_generated_hashes() {
        let chain = NullChainClient::new("wasm1faucet");
        let fee = StdFee::new(vec![Coin::new("ujuno", TokenAmount::new(200))], 200_000);

        let r1 = chain
            .bank_send("wasm1a", vec![Coin::new("ujuno", TokenAmount::new(5))], &fee)
            .await
            .unwrap();
        let r2 = chain
            .bank_send("wasm1b", vec![Coin::new("ujuno", TokenAmount::new(6))], &fee)
            .await
            .unwrap();

        assert_eq!(r1.tx_hash, "TX-1");
        assert_eq!(r2.tx_hash, "TX-2");
        assert_eq!(chain.transfers().len(), 2);
        assert_eq!(chain.transfers()[1].to, "wasm1b");
    }

    #[tokio::test]
    async fn injected_broadcast_failure() {
        let chain = NullChainClient::new("wasm1faucet");
        chain.fail_broadcasts("mempool full");
        let fee = StdFee::new(vec![], 200_000);
        let err = chain.bank_send("wasm1a", vec![], &fee).await.unwrap_err();
        assert!(matches!(err, ChainError::Broadcast(_)));

        chain.heal();
        assert!(chain.bank_send("wasm1a", vec![], &fee).await.is_ok());
    }

    #[tokio::test]
    async fn tx_lookup_is_scriptable() {
        let chain = NullChainClient::new("wasm1faucet");
        assert!(chain.tx("TX-9").await.unwrap().is_none());

        chain.set_tx_result("TX-9", 42, 0);
        let result = chain.tx("TX-9").await.unwrap().unwrap();
        assert_eq!(result.height, 42);
        assert!(result.succeeded());
    }

    #[tokio::test]
    async fn sequence_advances_per_broadcast() {
        let chain = NullChainClient::new("wasm1faucet");
        chain.set_sequence(7);
        let fee = StdFee::new(vec![], 200_000);
        chain.bank_send("wasm1a", vec![], &fee).await.unwrap();
        assert_eq!(chain.account("wasm1faucet").await.unwrap().sequence, 8);
    }
}
