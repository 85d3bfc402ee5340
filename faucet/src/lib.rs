//! Claim-settlement core of the drip faucet.
//!
//! Four cooperating components built from injected collaborators:
//!
//! - [`WalletManager`] owns the hot wallet, refreshes the published
//!   [`drip_types::WalletState`] snapshot and executes transfers.
//! - [`ClaimPipeline`] owns the bounded claim queue, the claim state machine
//!   and crash recovery, and drives the periodic settlement tick.
//! - [`RefillController`] keeps the wallet's available token balance inside
//!   the configured band by withdrawing from or depositing to a treasury
//!   contract.
//! - [`StatusBoard`] carries operator-visible health, one writer per slot.

pub mod config;
pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod refill;
pub mod shutdown;
pub mod stats;
pub mod status;
pub mod wallet;

pub use config::FaucetConfig;
pub use error::FaucetError;
pub use hooks::ClaimHook;
pub use pipeline::ClaimPipeline;
pub use refill::{RefillController, RefillOutcome};
pub use shutdown::ShutdownController;
pub use stats::FaucetStats;
pub use status::{StatusBoard, StatusEntry, StatusLevel};
pub use wallet::WalletManager;
