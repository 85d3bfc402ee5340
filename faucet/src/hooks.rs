//! Extension seam for eligibility and post-claim modules.
//!
//! Anti-abuse and reward modules plug in here instead of being located
//! through a global registry: the pipeline receives its hooks at
//! construction and calls them in order.

use crate::FaucetError;
use drip_types::{ClaimInfo, SessionRecord};

/// Callbacks around the claim lifecycle.
pub trait ClaimHook: Send + Sync {
    /// Runs before a claim is enqueued. Returning an error rejects the
    /// claim: client-visible errors reach the caller verbatim, anything
    /// else is wrapped as an internal error.
    fn before_claim(&self, _session: &SessionRecord) -> Result<(), FaucetError> {
        Ok(())
    }

    /// Fired after a claim's transfer confirmed on chain.
    fn session_claimed(&self, _info: &ClaimInfo) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use drip_types::{SessionStatus, TokenAmount};

    struct DefaultHook;
    impl ClaimHook for DefaultHook {}

    #[test]
    fn default_hook_accepts_everything() {
        let record = SessionRecord {
            session_id: "s".into(),
            status: SessionStatus::Claimable,
            target_addr: "wasm1x".into(),
            drop_amount: TokenAmount::new(1),
            claim: None,
        };
        assert!(DefaultHook.before_claim(&record).is_ok());
    }
}
