//! Axum router and server for the faucet API.

use crate::error::RpcError;
use crate::handlers::{self, ApiState};
use axum::routing::{get, post};
use axum::Router;
use drip_websocket::{serve_claim_socket, WsServerState};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Build the full router: JSON API plus the claim WebSocket.
pub fn build_router(api: Arc<ApiState>, ws: Arc<WsServerState>) -> Router {
    let api_routes = Router::new()
        .route("/api/claimReward", post(handlers::claim_reward))
        .route("/api/getSessionStatus", get(handlers::get_session_status))
        .route("/api/getQueueStatus", get(handlers::get_queue_status))
        .with_state(api);

    let ws_routes = Router::new()
        .route("/ws/claim", get(serve_claim_socket))
        .with_state(ws);

    api_routes.merge(ws_routes)
}

/// The API server, configured with a port and its route state.
pub struct ApiServer {
    pub port: u16,
    api: Arc<ApiState>,
    ws: Arc<WsServerState>,
}

impl ApiServer {
    pub fn new(port: u16, api: Arc<ApiState>, ws: Arc<WsServerState>) -> Self {
        Self { port, api, ws }
    }

    /// Serve until the shutdown signal fires.
    pub async fn start(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), RpcError> {
        let app = build_router(self.api.clone(), self.ws.clone());
        let addr = format!("0.0.0.0:{}", self.port);
        info!("faucet API listening on {}", addr);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
