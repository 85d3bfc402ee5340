//! Operator-visible status board.
//!
//! Each producer owns exactly one slot, keyed by its name, and overwrites it
//! wholesale. Readers take a snapshot; there is no history.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Severity of a status entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// One producer's current condition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub level: StatusLevel,
    pub message: String,
}

/// Single-writer status slots keyed by producer name.
pub struct StatusBoard {
    slots: Mutex<HashMap<String, StatusEntry>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the producer's slot.
    pub fn set(&self, producer: &str, level: StatusLevel, message: impl Into<String>) {
        self.slots.lock().unwrap().insert(
            producer.to_string(),
            StatusEntry {
                level,
                message: message.into(),
            },
        );
    }

    pub fn get(&self, producer: &str) -> Option<StatusEntry> {
        self.slots.lock().unwrap().get(producer).cloned()
    }

    pub fn snapshot(&self) -> HashMap<String, StatusEntry> {
        self.slots.lock().unwrap().clone()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_whole_slot() {
        let board = StatusBoard::new();
        board.set("wallet", StatusLevel::Error, "down");
        board.set("wallet", StatusLevel::Info, "");

        let entry = board.get("wallet").unwrap();
        assert_eq!(entry.level, StatusLevel::Info);
        assert_eq!(entry.message, "");
    }

    #[test]
    fn slots_are_independent() {
        let board = StatusBoard::new();
        board.set("wallet", StatusLevel::Warning, "low");
        board.set("refill", StatusLevel::Info, "");

        assert_eq!(board.snapshot().len(), 2);
        assert_eq!(board.get("wallet").unwrap().level, StatusLevel::Warning);
    }

    #[test]
    fn unknown_producer_is_none() {
        let board = StatusBoard::new();
        assert!(board.get("nope").is_none());
    }
}
