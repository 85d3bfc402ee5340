use drip_chain::ChainError;
use drip_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaucetError {
    // ── Client-visible claim errors ────────────────────────────────────
    #[error("session is not claimable")]
    NotClaimable,

    #[error("drop amount is below the configured minimum")]
    AmountTooLow,

    #[error("drop amount is above the configured maximum")]
    AmountTooHigh,

    #[error("target address does not carry the expected prefix")]
    InvalidAddress,

    #[error("a claim for this session is already in progress")]
    RaceClaiming,

    #[error("internal error: {0}")]
    Internal(String),

    // ── Operator-visible errors ────────────────────────────────────────
    #[error("wallet is not ready")]
    WalletNotReady,

    #[error("transaction broadcast failed: {0}")]
    TxBroadcast(String),

    #[error("chain RPC error: {0}")]
    ChainRpc(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),
}

impl FaucetError {
    /// Stable machine-readable code, exposed through the HTTP API.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotClaimable => "NOT_CLAIMABLE",
            Self::AmountTooLow => "AMOUNT_TOO_LOW",
            Self::AmountTooHigh => "AMOUNT_TOO_HIGH",
            Self::InvalidAddress => "INVALID_ADDRESS",
            Self::RaceClaiming => "RACE_CLAIMING",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::WalletNotReady => "ERR_WALLET_NOT_READY",
            Self::TxBroadcast(_) => "ERR_TX_BROADCAST",
            Self::ChainRpc(_) => "ERR_CHAIN_RPC",
            Self::Store(_) | Self::Config(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is meant for API clients (vs. operators/logs).
    pub fn is_client_visible(&self) -> bool {
        matches!(
            self,
            Self::NotClaimable
                | Self::AmountTooLow
                | Self::AmountTooHigh
                | Self::InvalidAddress
                | Self::RaceClaiming
                | Self::Internal(_)
        )
    }
}

impl From<ChainError> for FaucetError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Broadcast(msg) => Self::TxBroadcast(msg),
            other => Self::ChainRpc(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_visibility_split() {
        assert!(FaucetError::RaceClaiming.is_client_visible());
        assert!(FaucetError::Internal("x".into()).is_client_visible());
        assert!(!FaucetError::WalletNotReady.is_client_visible());
        assert!(!FaucetError::ChainRpc("x".into()).is_client_visible());
    }

    #[test]
    fn chain_broadcast_maps_to_tx_broadcast() {
        let e: FaucetError = ChainError::Broadcast("rejected".into()).into();
        assert!(matches!(e, FaucetError::TxBroadcast(_)));
        let e: FaucetError = ChainError::Rpc("timeout".into()).into();
        assert!(matches!(e, FaucetError::ChainRpc(_)));
    }
}
