//! Persisted session records.
//!
//! The faucet core only sees sessions from `Claimable` onward; everything
//! before that (task solving, eligibility) happens upstream and is stored by
//! the same record.

use crate::{Claim, TokenAmount};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Tasks still being solved.
    Running,
    /// Eligible to submit a claim.
    Claimable,
    /// A claim has been created and is settling.
    Claiming,
    /// The claim settled (confirmed or failed; the claim record carries which).
    Finished,
}

/// A session as stored by the persistence service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub status: SessionStatus,
    /// Recipient address the drop will be sent to.
    pub target_addr: String,
    /// Base-unit amount committed to this session.
    pub drop_amount: TokenAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<Claim>,
}

impl SessionRecord {
    /// Whether this session's balance is still committed but not yet in the
    /// claim pipeline (counts toward unclaimed balance).
    pub fn is_unclaimed(&self) -> bool {
        matches!(self.status, SessionStatus::Running | SessionStatus::Claimable)
    }
}
