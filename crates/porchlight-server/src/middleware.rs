use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::AppState};

/// Header carrying the shared analytics secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Extract the real client IP from `X-Forwarded-For` (first entry).
///
/// Falls back to `"unknown"` when the header is absent — behind the expected
/// reverse proxy the header is always present.
pub fn extract_client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Coarse allow/deny gate: compare the `X-API-Key` header against the
/// configured shared secret. No key configured means the gate is open
/// (local development). This is not a session or user model.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = state.config.api_key.as_deref() {
        let provided = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected) {
            return AppError::Unauthorized.into_response();
        }
    }
    next.run(request).await
}

/// IP-keyed sliding-window rate limit applied to every analytics route.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(request.headers());
    if !state.check_rate_limit(&ip).await {
        tracing::warn!(ip, "Rate limit exceeded");
        return AppError::RateLimited.into_response();
    }
    next.run(request).await
}
