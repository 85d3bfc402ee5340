//! WebSocket endpoint for claim progress.
//!
//! `GET /ws/claim?session=<id>` upgrades the connection, validates that the
//! session is mid-claim, then attaches a hub subscription bound to that
//! claim's index. Outbound frames are JSON `{action, data}` with
//! `action ∈ {"update", "error"}`.

use crate::hub::{NotificationHub, SinkMessage};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use drip_store::SessionStore;
use drip_types::{SessionStatus, Timestamp};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// Shared state for the claim socket route.
pub struct WsServerState {
    pub hub: Arc<NotificationHub>,
    pub store: Arc<dyn SessionStore>,
}

#[derive(Deserialize)]
pub struct ClaimSocketQuery {
    session: String,
}

/// Axum handler that upgrades `/ws/claim` requests.
pub async fn serve_claim_socket(
    ws: WebSocketUpgrade,
    Query(query): Query<ClaimSocketQuery>,
    State(state): State<Arc<WsServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, query.session, state))
}

/// Serialize one sink message into a websocket frame.
fn encode(msg: &SinkMessage) -> Option<Message> {
    match msg {
        SinkMessage::Update(progress) => Some(Message::Text(
            serde_json::json!({ "action": "update", "data": progress }).to_string(),
        )),
        SinkMessage::Error(text) => Some(Message::Text(
            serde_json::json!({ "action": "error", "data": text }).to_string(),
        )),
        SinkMessage::Ping => Some(Message::Ping(Vec::new())),
        SinkMessage::Close(_) => None,
    }
}

/// Handle one upgraded claim socket.
///
/// The socket is split: a writer task drains the subscriber channel, the
/// read half watches for ping/pong activity and disconnects. The hub never
/// touches the socket directly.
async fn handle_socket(socket: WebSocket, session_id: String, state: Arc<WsServerState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // The session must exist, be mid-claim, and carry a claim record.
    let claim_idx = match state.store.get_session(&session_id) {
        Ok(Some(record)) if record.status == SessionStatus::Claiming => {
            match record.claim {
                Some(claim) => claim.claim_idx,
                None => {
                    send_error_and_close(&mut ws_tx, "session has no claim").await;
                    return;
                }
            }
        }
        Ok(_) => {
            send_error_and_close(&mut ws_tx, "session is not claiming").await;
            return;
        }
        Err(e) => {
            warn!(%session_id, error = %e, "session lookup failed during ws attach");
            send_error_and_close(&mut ws_tx, "internal error").await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscriber = state.hub.subscribe(claim_idx, tx, Timestamp::now());
    debug!(%session_id, claim_idx, "claim socket attached");

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg {
                SinkMessage::Close(reason) => {
                    debug!(%reason, "closing claim socket");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
                other => {
                    if let Some(frame) = encode(&other) {
                        if ws_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });

    // Read half: only ping/pong activity matters; anything fatal detaches.
    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                state.hub.record_activity(subscriber, Timestamp::now());
            }
            Ok(Message::Text(text)) if text.trim() == "ping" => {
                state.hub.record_activity(subscriber, Timestamp::now());
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "claim socket receive error");
                break;
            }
        }
    }

    state.hub.remove(subscriber);
    writer.abort();
    debug!(%session_id, "claim socket detached");
}

async fn send_error_and_close(
    ws_tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    message: &str,
) {
    let frame = Message::Text(
        serde_json::json!({ "action": "error", "data": message }).to_string(),
    );
    let _ = ws_tx.send(frame).await;
    let _ = ws_tx.send(Message::Close(None)).await;
}

/// Spawn the keepalive pinger: one round per `ping_interval_secs`, stopping
/// on shutdown.
pub fn spawn_keepalive_task(
    hub: Arc<NotificationHub>,
    ping_interval_secs: u64,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(ping_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => hub.keepalive_round(Timestamp::now()),
                _ = shutdown.recv() => break,
            }
        }
    })
}
