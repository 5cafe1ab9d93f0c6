use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::dto::ErrorResponse;
use crate::state::AppState;

pub const ACCESS_DENIED: &str = "Access denied: Unauthorized IP";

/// Middleware that only lets requests from allow-listed source addresses through.
pub async fn require_allowed_ip(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let ip = peer.ip().to_canonical();
    tracing::info!(client_ip = %ip, "Request from");

    if !state.config.is_allowed(ip) {
        tracing::warn!(client_ip = %ip, path = %request.uri().path(), "Rejected request from unlisted address");
        let body = ErrorResponse {
            error: ACCESS_DENIED.to_string(),
            message: None,
        };
        return (StatusCode::FORBIDDEN, axum::Json(body)).into_response();
    }

    next.run(request).await
}
