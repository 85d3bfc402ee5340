use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    /// Transport or provider failure; carries the provider's message.
    #[error("chain RPC error: {0}")]
    Rpc(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The node rejected the broadcast.
    #[error("broadcast failed: {0}")]
    Broadcast(String),
}
