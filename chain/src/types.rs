//! Wire DTOs shared by the chain clients.

use drip_types::TokenAmount;
use serde::{Deserialize, Serialize};

/// A denominated coin amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: TokenAmount,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: TokenAmount) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

/// Standard fee: coins paid plus a gas limit.
///
/// The gas limit travels as a string, matching the chain's integer-string
/// convention for u64 fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

impl StdFee {
    pub fn new(amount: Vec<Coin>, gas_limit: u64) -> Self {
        Self {
            amount,
            gas: gas_limit.to_string(),
        }
    }

    /// The first fee coin's amount, or zero when no fee coin is attached.
    pub fn first_amount(&self) -> TokenAmount {
        self.amount
            .first()
            .map(|c| c.amount)
            .unwrap_or(TokenAmount::ZERO)
    }
}

/// On-chain account metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub account_number: u64,
    pub sequence: u64,
}

/// Result of a transaction lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    pub hash: String,
    pub height: u64,
    /// 0 means success; any other code is a failed execution.
    pub code: u32,
    #[serde(default)]
    pub raw_log: String,
}

impl TxResult {
    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}

/// Result of a successful broadcast (inclusion not yet known).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    pub tx_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_first_amount() {
        let fee = StdFee::new(vec![Coin::new("ujuno", TokenAmount::new(200))], 200_000);
        assert_eq!(fee.first_amount(), TokenAmount::new(200));
        assert_eq!(fee.gas, "200000");

        let empty = StdFee::new(vec![], 100_000);
        assert_eq!(empty.first_amount(), TokenAmount::ZERO);
    }

    #[test]
    fn tx_result_success_is_code_zero() {
        let ok = TxResult {
            hash: "AB".into(),
            height: 10,
            code: 0,
            raw_log: String::new(),
        };
        assert!(ok.succeeded());
        let failed = TxResult { code: 11, ..ok };
        assert!(!failed.succeeded());
    }
}
