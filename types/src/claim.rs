//! Claim records and the claim state machine.
//!
//! A claim is a committed intent to transfer `amount` to `target_addr` on
//! behalf of a session. Claims move `Queue → Processing → Pending →
//! Confirmed`, with `Failed` reachable from any non-terminal state. The two
//! terminal states are never left.

use crate::{Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};

/// Settlement state of a claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    /// Waiting in the FIFO queue.
    Queue,
    /// Dequeued; a broadcast attempt is in progress.
    Processing,
    /// Broadcast succeeded; awaiting chain confirmation.
    Pending,
    /// Included on chain with code 0.
    Confirmed,
    /// Broadcast or confirmation failed. Never retried.
    Failed,
}

impl ClaimStatus {
    /// Whether this state can never be left.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }
}

/// A single claim, as persisted alongside its session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    /// Strictly increasing, system-wide unique ordering key.
    pub claim_idx: u64,
    pub status: ClaimStatus,
    /// Set once at creation.
    pub claim_time: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_error: Option<String>,
}

impl Claim {
    /// A fresh claim in `Queue` state.
    pub fn new(claim_idx: u64, claim_time: Timestamp) -> Self {
        Self {
            claim_idx,
            status: ClaimStatus::Queue,
            claim_time,
            tx_hash: None,
            tx_height: None,
            tx_fee: None,
            tx_error: None,
        }
    }
}

/// A claim together with its settlement parameters.
///
/// One `ClaimInfo` exists per session; the association is dropped once the
/// claim reaches a terminal state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimInfo {
    pub session_id: String,
    pub target_addr: String,
    pub amount: TokenAmount,
    pub claim: Claim,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!ClaimStatus::Queue.is_terminal());
        assert!(!ClaimStatus::Processing.is_terminal());
        assert!(!ClaimStatus::Pending.is_terminal());
        assert!(ClaimStatus::Confirmed.is_terminal());
        assert!(ClaimStatus::Failed.is_terminal());
    }

    #[test]
    fn new_claim_starts_queued_with_empty_tx_fields() {
        let c = Claim::new(7, Timestamp::new(1000));
        assert_eq!(c.claim_idx, 7);
        assert_eq!(c.status, ClaimStatus::Queue);
        assert_eq!(c.claim_time, Timestamp::new(1000));
        assert!(c.tx_hash.is_none());
        assert!(c.tx_error.is_none());
    }

    #[test]
    fn claim_serializes_camel_case() {
        let c = Claim::new(3, Timestamp::new(5));
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["claimIdx"], 3);
        assert_eq!(json["status"], "queue");
        // unset tx fields are omitted entirely
        assert!(json.get("txHash").is_none());
    }
}
