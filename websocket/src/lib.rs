//! Realtime claim-progress notifications.
//!
//! The [`NotificationHub`] fans the `(processedIdx, confirmedIdx)` watermark
//! out to subscribed clients and retires each subscription once its claim has
//! confirmed. The axum server in [`server`] attaches WebSocket clients at
//! `/ws/claim` and runs the keepalive pinger.

pub mod hub;
pub mod server;

pub use hub::{NotificationHub, SinkMessage, SubscriberId};
pub use server::{serve_claim_socket, spawn_keepalive_task, WsServerState};
