//! HTTP gateway client.
//!
//! Speaks a JSON `{action, ...}` POST dialect against a chain gateway that
//! handles transaction assembly and encoding. Signed actions carry the
//! wallet's public key and an Ed25519 signature over the canonical request
//! body.

use crate::client::{QueryClient, SigningClient};
use crate::error::ChainError;
use crate::keys::WalletKey;
use crate::types::{AccountEntry, BroadcastResult, Coin, StdFee, TxResult};
use async_trait::async_trait;
use drip_types::TokenAmount;
use std::time::Duration;

/// HTTP implementation of both chain client traits.
pub struct HttpChainClient {
    http: reqwest::Client,
    gateway_url: String,
    key: Option<WalletKey>,
    address: String,
}

impl HttpChainClient {
    /// A signing client bound to the given wallet key.
    pub fn new_signing(gateway_url: impl Into<String>, key: WalletKey) -> Result<Self, ChainError> {
        let address = key.address().to_string();
        Self::build(gateway_url.into(), Some(key), address)
    }

    /// A read-only client with no signing identity.
    pub fn new_readonly(gateway_url: impl Into<String>) -> Result<Self, ChainError> {
        Self::build(gateway_url.into(), None, String::new())
    }

    fn build(
        gateway_url: String,
        key: Option<WalletKey>,
        address: String,
    ) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ChainError::Rpc(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            gateway_url,
            key,
            address,
        })
    }

    /// POST one `{action, ...}` request and return the `result` field.
    async fn call(
        &self,
        action: &str,
        params: serde_json::Value,
        signed: bool,
    ) -> Result<serde_json::Value, ChainError> {
        let mut body = params;
        let obj = body
            .as_object_mut()
            .ok_or_else(|| ChainError::InvalidResponse("params must be a JSON object".into()))?;
        obj.insert("action".to_string(), serde_json::json!(action));

        if signed {
            let key = self
                .key
                .as_ref()
                .ok_or_else(|| ChainError::Broadcast("client has no signing key".into()))?;
            let canonical = serde_json::to_string(&body)
                .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
            let signature = key.sign_hex(canonical.as_bytes());
            let obj = body.as_object_mut().expect("body is an object");
            obj.insert("pubkey".to_string(), serde_json::json!(key.public_key_hex()));
            obj.insert("signature".to_string(), serde_json::json!(signature));
        }

        let response = self
            .http
            .post(&self.gateway_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Rpc(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ChainError::Rpc(format!(
                "gateway returned HTTP {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("invalid JSON response: {e}")))?;

        if let Some(err) = json.get("error").and_then(|e| e.as_str()) {
            return Err(ChainError::Rpc(format!("gateway error: {err}")));
        }

        Ok(json.get("result").cloned().unwrap_or(json))
    }

    fn decode<T: serde::de::DeserializeOwned>(
        value: serde_json::Value,
        what: &str,
    ) -> Result<T, ChainError> {
        serde_json::from_value(value)
            .map_err(|e| ChainError::InvalidResponse(format!("invalid {what} response: {e}")))
    }
}

#[async_trait]
impl QueryClient for HttpChainClient {
    async fn account(&self, addr: &str) -> Result<AccountEntry, ChainError> {
        let result = self
            .call("account", serde_json::json!({ "address": addr }), false)
            .await?;
        Self::decode(result, "account")
    }

    async fn balance(&self, addr: &str, denom: &str) -> Result<TokenAmount, ChainError> {
        let result = self
            .call(
                "balance",
                serde_json::json!({ "address": addr, "denom": denom }),
                false,
            )
            .await?;
        let coin: Coin = Self::decode(result, "balance")?;
        Ok(coin.amount)
    }

    async fn smart_query(
        &self,
        contract: &str,
        msg: &serde_json::Value,
    ) -> Result<serde_json::Value, ChainError> {
        self.call(
            "smart_query",
            serde_json::json!({ "contract": contract, "msg": msg }),
            false,
        )
        .await
    }

    async fn tx(&self, hash: &str) -> Result<Option<TxResult>, ChainError> {
        let result = self
            .call("tx", serde_json::json!({ "hash": hash }), false)
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Self::decode(result, "tx").map(Some)
    }
}

#[async_trait]
impl SigningClient for HttpChainClient {
    fn address(&self) -> &str {
        &self.address
    }

    async fn bank_send(
        &self,
        to: &str,
        amount: Vec<Coin>,
        fee: &StdFee,
    ) -> Result<BroadcastResult, ChainError> {
        let result = self
            .call(
                "bank_send",
                serde_json::json!({
                    "from": self.address,
                    "to": to,
                    "amount": amount,
                    "fee": fee,
                }),
                true,
            )
            .await
            .map_err(|e| match e {
                ChainError::Rpc(msg) => ChainError::Broadcast(msg),
                other => other,
            })?;
        Self::decode(result, "broadcast")
    }

    async fn execute_contract(
        &self,
        contract: &str,
        msg: &serde_json::Value,
        funds: Vec<Coin>,
        fee: &StdFee,
    ) -> Result<BroadcastResult, ChainError> {
        let result = self
            .call(
                "execute_contract",
                serde_json::json!({
                    "from": self.address,
                    "contract": contract,
                    "msg": msg,
                    "funds": funds,
                    "fee": fee,
                }),
                true,
            )
            .await
            .map_err(|e| match e {
                ChainError::Rpc(msg) => ChainError::Broadcast(msg),
                other => other,
            })?;
        Self::decode(result, "broadcast")
    }
}
