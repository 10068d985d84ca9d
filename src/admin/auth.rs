use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use super::AdminState;

/// Require `Authorization: Bearer <api_key>`: 401 without credentials, 403 with the wrong ones.
pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|key| !key.is_empty());

    let Some(presented) = presented else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    if bool::from(presented.as_bytes().ct_eq(state.api_key.as_bytes())) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(path = %request.uri().path(), "Admin API key rejected");
        Err(StatusCode::FORBIDDEN)
    }
}
