//! Session storage trait.

use crate::StoreError;
use drip_types::{Claim, SessionRecord, SessionStatus, TokenAmount};

/// Trait for session persistence.
///
/// The pipeline writes through this trait only; it never touches storage
/// directly. Implementations must make `update_session` a full replace and
/// `update_claim_data` a claim-only write so the two cannot clobber each
/// other's fields.
pub trait SessionStore: Send + Sync {
    /// All sessions currently in the given status.
    fn get_sessions(&self, status: SessionStatus) -> Result<Vec<SessionRecord>, StoreError>;

    /// Look up one session by id.
    fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Replace the full session record.
    fn update_session(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Replace only the claim data of a session.
    fn update_claim_data(&self, session_id: &str, claim: &Claim) -> Result<(), StoreError>;

    /// Sum of drop amounts committed to live sessions that have not yet
    /// entered the claim pipeline.
    fn unclaimed_balance(&self) -> Result<TokenAmount, StoreError>;
}
