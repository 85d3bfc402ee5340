use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use drip_faucet::FaucetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("unknown session")]
    UnknownSession,

    #[error(transparent)]
    Faucet(#[from] FaucetError),

    #[error("server error: {0}")]
    Server(String),
}

impl IntoResponse for RpcError {
    /// Client-visible faucet errors map to 400 with their stable code;
    /// everything else is a 500 carrying only `INTERNAL_ERROR`.
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            RpcError::UnknownSession => (
                StatusCode::NOT_FOUND,
                "UNKNOWN_SESSION",
                self.to_string(),
            ),
            RpcError::Faucet(e) if e.is_client_visible() => {
                (StatusCode::BAD_REQUEST, e.code(), e.to_string())
            }
            RpcError::Faucet(e) => {
                tracing::error!(error = %e, "api request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal error".to_string(),
                )
            }
            RpcError::Server(msg) => {
                tracing::error!(error = %msg, "api request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal error".to_string(),
                )
            }
        };
        let body = Json(serde_json::json!({ "code": code, "message": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_code() {
        let response = RpcError::Faucet(FaucetError::RaceClaiming).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn operator_errors_are_masked() {
        let response =
            RpcError::Faucet(FaucetError::ChainRpc("secret detail".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
