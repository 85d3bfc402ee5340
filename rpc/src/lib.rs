//! HTTP API for the drip faucet.
//!
//! Three endpoints feed the faucet frontend: claim submission, session
//! status, and an aggregated queue snapshot cached for a few seconds. The
//! claim WebSocket route from `drip_websocket` is mounted on the same
//! router.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use handlers::{ApiState, QueueStatusCache};
pub use server::{build_router, ApiServer};
