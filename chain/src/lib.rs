//! Chain-client abstraction for the drip faucet.
//!
//! The faucet core consumes two capabilities: a signing client that
//! broadcasts transfers and contract executions, and a read-only query
//! client for accounts, balances, smart queries and transaction lookups.
//! Both are traits; `HttpChainClient` implements them against a JSON
//! gateway, and `drip_nullables` provides a scripted double for tests.

pub mod client;
pub mod error;
pub mod http;
pub mod keys;
pub mod types;

pub use client::{QueryClient, SigningClient};
pub use error::ChainError;
pub use http::HttpChainClient;
pub use keys::WalletKey;
pub use types::{AccountEntry, BroadcastResult, Coin, StdFee, TxResult};
