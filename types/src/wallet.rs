//! Wallet snapshot and refill bookkeeping.

use crate::{Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of the dispensing wallet.
///
/// Replaced atomically by the wallet manager; observers never see partial
/// updates. The claim pipeline may derive a new snapshot with speculative
/// debits after a successful broadcast; the next full refresh reconciles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    pub ready: bool,
    /// The chain account's nonce.
    pub sequence: u64,
    pub token_balance: TokenAmount,
    pub native_balance: TokenAmount,
}

impl WalletState {
    /// The snapshot published while the wallet is unreachable.
    pub fn not_ready() -> Self {
        Self::default()
    }

    /// Snapshot with one broadcast accounted for: sequence bumped, gas and
    /// (for native drops) the sent amount debited from the native balance,
    /// the sent amount debited from the token balance.
    pub fn debit_send(mut self, amount: TokenAmount, gas: TokenAmount, native_token: bool) -> Self {
        self.sequence += 1;
        self.token_balance = self.token_balance.saturating_sub(amount);
        self.native_balance = self.native_balance.saturating_sub(gas);
        if native_token {
            self.native_balance = self.native_balance.saturating_sub(amount);
        }
        self
    }

    /// Snapshot with one contract execution accounted for: sequence bumped,
    /// the fee debited from the native balance. Token balance is untouched.
    pub fn debit_execute(mut self, fee: TokenAmount) -> Self {
        self.sequence += 1;
        self.native_balance = self.native_balance.saturating_sub(fee);
        self
    }
}

/// Refill controller bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefillState {
    pub last_success: Timestamp,
    pub last_attempt: Timestamp,
    pub in_flight: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> WalletState {
        WalletState {
            ready: true,
            sequence: 10,
            token_balance: TokenAmount::new(1_000),
            native_balance: TokenAmount::new(500),
        }
    }

    #[test]
    fn debit_send_contract_token() {
        let s = snapshot().debit_send(TokenAmount::new(100), TokenAmount::new(20), false);
        assert_eq!(s.sequence, 11);
        assert_eq!(s.token_balance, TokenAmount::new(900));
        assert_eq!(s.native_balance, TokenAmount::new(480));
    }

    #[test]
    fn debit_send_native_token_also_debits_native_amount() {
        let s = snapshot().debit_send(TokenAmount::new(100), TokenAmount::new(20), true);
        assert_eq!(s.native_balance, TokenAmount::new(380));
    }

    #[test]
    fn debit_execute_leaves_token_balance() {
        let s = snapshot().debit_execute(TokenAmount::new(30));
        assert_eq!(s.sequence, 11);
        assert_eq!(s.token_balance, TokenAmount::new(1_000));
        assert_eq!(s.native_balance, TokenAmount::new(470));
    }

    #[test]
    fn not_ready_is_zeroed() {
        let s = WalletState::not_ready();
        assert!(!s.ready);
        assert_eq!(s.sequence, 0);
        assert!(s.token_balance.is_zero());
        assert!(s.native_balance.is_zero());
    }
}
