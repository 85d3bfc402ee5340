//! Nullable session store — thread-safe in-memory storage for testing.

use drip_store::{SessionStore, StoreError};
use drip_types::{Claim, SessionRecord, SessionStatus, TokenAmount};
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory session store.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullSessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    /// When set, every store call fails with this message.
    fail_with: Mutex<Option<String>>,
}

impl NullSessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            fail_with: Mutex::new(None),
        }
    }

    /// Seed a session directly (bypassing the trait, for test setup).
    pub fn seed(&self, record: SessionRecord) {
        self.sessions
            .lock()
            .unwrap()
            .insert(record.session_id.clone(), record);
    }

    /// Make every subsequent call fail with the given message.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.lock().unwrap() = Some(message.into());
    }

    /// Clear a previously injected failure.
    pub fn heal(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        match self.fail_with.lock().unwrap().as_ref() {
            Some(msg) => Err(StoreError::Backend(msg.clone())),
            None => Ok(()),
        }
    }
}

impl Default for NullSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for NullSessionStore {
    fn get_sessions(&self, status: SessionStatus) -> Result<Vec<SessionRecord>, StoreError> {
        self.check_failure()?;
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect())
    }

    fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        self.check_failure()?;
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }

    fn update_session(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.check_failure()?;
        self.sessions
            .lock()
            .unwrap()
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    fn update_claim_data(&self, session_id: &str, claim: &Claim) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut sessions = self.sessions.lock().unwrap();
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
        record.claim = Some(claim.clone());
        Ok(())
    }

    fn unclaimed_balance(&self) -> Result<TokenAmount, StoreError> {
        self.check_failure()?;
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.is_unclaimed())
            .fold(TokenAmount::ZERO, |acc, s| {
                acc.saturating_add(s.drop_amount)
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, status: SessionStatus, amount: u128) -> SessionRecord {
        SessionRecord {
            session_id: id.to_string(),
            status,
            target_addr: "wasm1target".into(),
            drop_amount: TokenAmount::new(amount),
            claim: None,
        }
    }

    #[test]
    fn filters_by_status() {
        let store = NullSessionStore::new();
        store.seed(record("a", SessionStatus::Claimable, 10));
        store.seed(record("b", SessionStatus::Claiming, 20));

        let claiming = store.get_sessions(SessionStatus::Claiming).unwrap();
        assert_eq!(claiming.len(), 1);
        assert_eq!(claiming[0].session_id, "b");
    }

    #[test]
    fn update_claim_data_touches_only_claim() {
        let store = NullSessionStore::new();
        store.seed(record("a", SessionStatus::Claiming, 10));

        let claim = Claim::new(1, drip_types::Timestamp::new(0));
        store.update_claim_data("a", &claim).unwrap();

        let stored = store.get_session("a").unwrap().unwrap();
        assert_eq!(stored.claim.as_ref().unwrap().claim_idx, 1);
        assert_eq!(stored.status, SessionStatus::Claiming);
        assert_eq!(stored.drop_amount, TokenAmount::new(10));
    }

    #[test]
    fn update_claim_data_unknown_session_errors() {
        let store = NullSessionStore::new();
        let claim = Claim::new(1, drip_types::Timestamp::new(0));
        assert!(store.update_claim_data("missing", &claim).is_err());
    }

    #[test]
    fn unclaimed_balance_sums_pre_claim_sessions() {
        let store = NullSessionStore::new();
        store.seed(record("a", SessionStatus::Running, 5));
        store.seed(record("b", SessionStatus::Claimable, 10));
        store.seed(record("c", SessionStatus::Claiming, 100));
        store.seed(record("d", SessionStatus::Finished, 1000));

        assert_eq!(store.unclaimed_balance().unwrap(), TokenAmount::new(15));
    }

    #[test]
    fn injected_failure_propagates() {
        let store = NullSessionStore::new();
        store.fail_with("disk on fire");
        assert!(store.get_session("a").is_err());
        store.heal();
        assert!(store.get_session("a").is_ok());
    }
}
