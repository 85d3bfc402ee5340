//! Aggregate settlement statistics.

use drip_types::TokenAmount;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Lifetime counters for claim settlement.
///
/// The counter set is fixed: one per terminal outcome plus creations.
/// Dispensed volume is a `TokenAmount` (not a u64 counter) so it cannot
/// overflow in base units.
pub struct FaucetStats {
    claims_created: AtomicU64,
    claims_confirmed: AtomicU64,
    claims_failed: AtomicU64,
    dispensed: Mutex<TokenAmount>,
}

impl FaucetStats {
    pub fn new() -> Self {
        Self {
            claims_created: AtomicU64::new(0),
            claims_confirmed: AtomicU64::new(0),
            claims_failed: AtomicU64::new(0),
            dispensed: Mutex::new(TokenAmount::ZERO),
        }
    }

    pub fn record_created(&self) {
        self.claims_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_confirmed(&self, amount: TokenAmount) {
        self.claims_confirmed.fetch_add(1, Ordering::Relaxed);
        let mut dispensed = self.dispensed.lock().unwrap();
        *dispensed = dispensed.saturating_add(amount);
    }

    pub fn record_failed(&self) {
        self.claims_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn claims_created(&self) -> u64 {
        self.claims_created.load(Ordering::Relaxed)
    }

    pub fn claims_confirmed(&self) -> u64 {
        self.claims_confirmed.load(Ordering::Relaxed)
    }

    pub fn claims_failed(&self) -> u64 {
        self.claims_failed.load(Ordering::Relaxed)
    }

    pub fn dispensed(&self) -> TokenAmount {
        *self.dispensed.lock().unwrap()
    }
}

impl Default for FaucetStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = FaucetStats::new();
        stats.record_created();
        stats.record_created();
        stats.record_confirmed(TokenAmount::new(100));
        stats.record_failed();

        assert_eq!(stats.claims_created(), 2);
        assert_eq!(stats.claims_confirmed(), 1);
        assert_eq!(stats.claims_failed(), 1);
        assert_eq!(stats.dispensed(), TokenAmount::new(100));
    }

    #[test]
    fn dispensed_sums_across_confirmations() {
        let stats = FaucetStats::new();
        stats.record_confirmed(TokenAmount::new(60));
        stats.record_confirmed(TokenAmount::new(40));
        assert_eq!(stats.dispensed(), TokenAmount::new(100));
        assert_eq!(stats.claims_confirmed(), 2);
    }
}
