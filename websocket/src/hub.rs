//! Notification hub — progress fan-out to waiting clients.
//!
//! Subscribers hand the hub a channel sender; a writer task per connection
//! drains the channel onto the socket. Keeping the hub side synchronous means
//! broadcasts never await socket I/O, and tests can subscribe with a plain
//! channel instead of a socket.

use drip_types::{Progress, Timestamp};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Close reason once a subscriber's claim has confirmed.
pub const CLOSE_CLAIM_CONFIRMED: &str = "claim confirmed";
/// Close reason when the keepalive window elapses without ping/pong.
pub const CLOSE_PING_TIMEOUT: &str = "ping timeout";

/// Messages delivered to a subscriber's writer task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkMessage {
    /// `{action: "update", data: progress}`
    Update(Progress),
    /// `{action: "error", data: message}`
    Error(String),
    /// Keepalive ping frame.
    Ping,
    /// Close the socket with the given reason.
    Close(String),
}

/// Opaque handle identifying one subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Subscriber {
    id: SubscriberId,
    /// The claim this client is waiting on.
    claim_idx: u64,
    tx: mpsc::UnboundedSender<SinkMessage>,
    /// Last ping/pong activity, for keepalive eviction.
    last_seen: Timestamp,
}

struct HubInner {
    subscribers: Vec<Subscriber>,
    last_broadcast: Option<Progress>,
    next_id: u64,
}

/// Process-wide subscriber registry plus the last-broadcast slot.
pub struct NotificationHub {
    inner: Mutex<HubInner>,
    /// Seconds without ping/pong before a subscriber is dropped.
    ping_timeout_secs: u64,
}

impl NotificationHub {
    pub fn new(ping_timeout_secs: u64) -> Self {
        Self {
            inner: Mutex::new(HubInner {
                subscribers: Vec::new(),
                last_broadcast: None,
                next_id: 1,
            }),
            ping_timeout_secs,
        }
    }

    /// Register a subscriber waiting on `claim_idx`.
    ///
    /// If a broadcast has already happened, the subscriber immediately
    /// receives it — and is closed right away when that broadcast already
    /// satisfies its claim.
    pub fn subscribe(
        &self,
        claim_idx: u64,
        tx: mpsc::UnboundedSender<SinkMessage>,
        now: Timestamp,
    ) -> SubscriberId {
        let mut inner = self.inner.lock().unwrap();
        let id = SubscriberId(inner.next_id);
        inner.next_id += 1;

        let last = inner.last_broadcast;
        inner.subscribers.push(Subscriber {
            id,
            claim_idx,
            tx,
            last_seen: now,
        });

        if let Some(progress) = last {
            let satisfied = Self::deliver(inner.subscribers.last().expect("just pushed"), progress);
            if satisfied {
                inner.subscribers.retain(|s| s.id != id);
            }
        }
        id
    }

    /// Replace the last-broadcast slot and deliver to every subscriber.
    ///
    /// Subscribers whose claim is satisfied by this update are closed with
    /// `"claim confirmed"`; subscribers whose channel is gone are dropped.
    pub fn broadcast(&self, progress: Progress) {
        let mut inner = self.inner.lock().unwrap();
        inner.last_broadcast = Some(progress);
        inner.subscribers.retain(|sub| !Self::deliver(sub, progress));
    }

    /// Send an update to one subscriber. Returns true when the subscriber is
    /// now satisfied and must be removed.
    fn deliver(sub: &Subscriber, progress: Progress) -> bool {
        if sub.tx.send(SinkMessage::Update(progress)).is_err() {
            return true;
        }
        if progress.confirmed_idx >= sub.claim_idx {
            let _ = sub
                .tx
                .send(SinkMessage::Close(CLOSE_CLAIM_CONFIRMED.to_string()));
            return true;
        }
        false
    }

    /// Record ping/pong activity for a subscriber.
    pub fn record_activity(&self, id: SubscriberId, now: Timestamp) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(sub) = inner.subscribers.iter_mut().find(|s| s.id == id) {
            sub.last_seen = now;
        }
    }

    /// One keepalive round: evict subscribers silent past the timeout, ping
    /// the rest.
    pub fn keepalive_round(&self, now: Timestamp) {
        let timeout = self.ping_timeout_secs;
        let mut inner = self.inner.lock().unwrap();
        inner.subscribers.retain(|sub| {
            if sub.last_seen.has_expired(timeout, now) {
                let _ = sub
                    .tx
                    .send(SinkMessage::Close(CLOSE_PING_TIMEOUT.to_string()));
                return false;
            }
            sub.tx.send(SinkMessage::Ping).is_ok()
        });
    }

    /// Remove a subscriber (socket error or disconnect). Idempotent.
    pub fn remove(&self, id: SubscriberId) {
        self.inner
            .lock()
            .unwrap()
            .subscribers
            .retain(|s| s.id != id);
    }

    /// Clear the last-broadcast slot (pipeline shutdown).
    pub fn reset(&self) {
        self.inner.lock().unwrap().last_broadcast = None;
    }

    pub fn last_broadcast(&self) -> Option<Progress> {
        self.inner.lock().unwrap().last_broadcast
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (
        mpsc::UnboundedSender<SinkMessage>,
        mpsc::UnboundedReceiver<SinkMessage>,
    ) {
        mpsc::unbounded_channel()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SinkMessage>) -> Vec<SinkMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn broadcast_reaches_all_subscribers() {
        let hub = NotificationHub::new(120);
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        hub.subscribe(10, tx1, Timestamp::new(0));
        hub.subscribe(20, tx2, Timestamp::new(0));

        hub.broadcast(Progress::new(5, 2));

        assert_eq!(drain(&mut rx1), vec![SinkMessage::Update(Progress::new(5, 2))]);
        assert_eq!(drain(&mut rx2), vec![SinkMessage::Update(Progress::new(5, 2))]);
        assert_eq!(hub.last_broadcast(), Some(Progress::new(5, 2)));
    }

    #[test]
    fn late_subscriber_receives_last_broadcast() {
        let hub = NotificationHub::new(120);
        hub.broadcast(Progress::new(3, 1));

        let (tx, mut rx) = channel();
        hub.subscribe(10, tx, Timestamp::new(0));

        assert_eq!(drain(&mut rx), vec![SinkMessage::Update(Progress::new(3, 1))]);
    }

    #[test]
    fn subscriber_closed_once_claim_confirms() {
        let hub = NotificationHub::new(120);
        let (tx, mut rx) = channel();
        hub.subscribe(4, tx, Timestamp::new(0));

        hub.broadcast(Progress::new(4, 3));
        assert_eq!(hub.subscriber_count(), 1);

        hub.broadcast(Progress::new(5, 4));
        assert_eq!(hub.subscriber_count(), 0);

        let msgs = drain(&mut rx);
        assert_eq!(
            msgs.last(),
            Some(&SinkMessage::Close(CLOSE_CLAIM_CONFIRMED.to_string()))
        );
    }

    #[test]
    fn late_subscriber_already_satisfied_closes_immediately() {
        let hub = NotificationHub::new(120);
        hub.broadcast(Progress::new(9, 9));

        let (tx, mut rx) = channel();
        hub.subscribe(7, tx, Timestamp::new(0));

        assert_eq!(hub.subscriber_count(), 0);
        let msgs = drain(&mut rx);
        assert_eq!(msgs.len(), 2);
        assert_eq!(
            msgs[1],
            SinkMessage::Close(CLOSE_CLAIM_CONFIRMED.to_string())
        );
    }

    #[test]
    fn keepalive_evicts_silent_subscribers() {
        let hub = NotificationHub::new(120);
        let (tx_quiet, mut rx_quiet) = channel();
        let (tx_live, mut rx_live) = channel();
        let quiet = hub.subscribe(10, tx_quiet, Timestamp::new(0));
        let live = hub.subscribe(10, tx_live, Timestamp::new(0));
        let _ = quiet;

        hub.record_activity(live, Timestamp::new(100));
        hub.keepalive_round(Timestamp::new(130));

        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(
            drain(&mut rx_quiet).last(),
            Some(&SinkMessage::Close(CLOSE_PING_TIMEOUT.to_string()))
        );
        assert_eq!(drain(&mut rx_live), vec![SinkMessage::Ping]);
    }

    #[test]
    fn remove_is_idempotent() {
        let hub = NotificationHub::new(120);
        let (tx, _rx) = channel();
        let id = hub.subscribe(1, tx, Timestamp::new(0));
        hub.remove(id);
        hub.remove(id);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn broadcast_tolerates_dropped_receivers() {
        let hub = NotificationHub::new(120);
        let (tx_dead, rx_dead) = channel();
        let (tx_live, mut rx_live) = channel();
        hub.subscribe(100, tx_dead, Timestamp::new(0));
        hub.subscribe(100, tx_live, Timestamp::new(0));
        drop(rx_dead);

        hub.broadcast(Progress::new(1, 0));

        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(drain(&mut rx_live), vec![SinkMessage::Update(Progress::new(1, 0))]);
    }

    #[test]
    fn reset_clears_last_broadcast_only() {
        let hub = NotificationHub::new(120);
        let (tx, _rx) = channel();
        hub.subscribe(5, tx, Timestamp::new(0));
        hub.broadcast(Progress::new(1, 0));

        hub.reset();

        assert_eq!(hub.last_broadcast(), None);
        assert_eq!(hub.subscriber_count(), 1);
    }
}
