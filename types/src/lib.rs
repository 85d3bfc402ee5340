//! Fundamental types for the drip faucet.
//!
//! This crate defines the value types shared across every other crate in the
//! workspace: token amounts, timestamps, claim and session records, wallet
//! snapshots, and the progress watermark. No I/O lives here.

pub mod amount;
pub mod claim;
pub mod progress;
pub mod session;
pub mod time;
pub mod wallet;

pub use amount::{AmountParseError, TokenAmount};
pub use claim::{Claim, ClaimInfo, ClaimStatus};
pub use progress::Progress;
pub use session::{SessionRecord, SessionStatus};
pub use time::Timestamp;
pub use wallet::{RefillState, WalletState};
