//! Queue progress watermark.

use serde::{Deserialize, Serialize};

/// The pair of counters published to waiting clients.
///
/// `processed_idx` is the claim index most recently dequeued for broadcast;
/// `confirmed_idx` the highest claim index confirmed on chain. Both are
/// monotone. A broadcast where only one has advanced is a legitimate
/// observable state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub processed_idx: u64,
    pub confirmed_idx: u64,
}

impl Progress {
    pub fn new(processed_idx: u64, confirmed_idx: u64) -> Self {
        Self {
            processed_idx,
            confirmed_idx,
        }
    }
}
